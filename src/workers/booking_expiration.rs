use crate::store::Store;
use crate::sweeper;

pub async fn run(store: &Store) {
    tracing::debug!("booking_expiration: start");
    match sweeper::sweep(store) {
        Ok(summary) => {
            tracing::info!(expired = summary.count, "booking_expiration: done")
        }
        Err(e) => {
            tracing::error!(error=%e, stage = e.stage(), "booking_expiration failed")
        }
    }
}
