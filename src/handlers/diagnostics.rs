use std::sync::{Arc, Mutex, OnceLock};

use axum::{extract::State, Json};
use sysinfo::System;
use tracing::info;

use crate::models::DiagnosticsResponse;
use crate::AppState;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Presence and process diagnostics
pub async fn diagnostics(State(state): State<Arc<AppState>>) -> Json<DiagnosticsResponse> {
    let connections = state.registry.connection_count().await;
    let document_groups = state.registry.document_group_count().await;
    let call_rooms = state.registry.call_room_count().await;

    // System stats
    let (cpu_usage, memory_used, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB, Conn: {}, Groups: {}, Rooms: {}",
        cpu_usage,
        memory_used / 1024 / 1024,
        memory_total / 1024 / 1024,
        connections,
        document_groups,
        call_rooms
    );

    Json(DiagnosticsResponse {
        connections,
        document_groups,
        call_rooms,
        cpu_usage,
        memory_used,
        memory_total,
    })
}
