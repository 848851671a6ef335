use axum::extract::State;

use crate::{
    error::AppError, response::ApiResponse, services::scheduler::HostStatus, state::AppState,
};

pub async fn list_hosts(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<HostStatus>>, AppError> {
    let hosts = state.scheduler.hosts().await?;
    Ok(ApiResponse::ok(hosts))
}
