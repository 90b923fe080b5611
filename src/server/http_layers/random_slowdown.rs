//! Random slowdown middleware, used to exercise clients against a laggy server

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use rand_distr::{Distribution, Normal};

const MEAN_DELAY_MS: f64 = 800.0;
const DELAY_STD_DEV_MS: f64 = 600.0;

fn sample_delay_ms() -> u64 {
    match Normal::new(MEAN_DELAY_MS, DELAY_STD_DEV_MS) {
        Ok(normal) => 0.0f64.max(normal.sample(&mut rand::rng())) as u64,
        Err(_) => MEAN_DELAY_MS as u64,
    }
}

/// Delays every request by a gaussian amount of time, clamped at zero.
pub async fn slowdown_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    tokio::time::sleep(std::time::Duration::from_millis(sample_delay_ms())).await;
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_are_never_negative() {
        for _ in 0..100 {
            assert!(sample_delay_ms() < 60_000);
        }
    }
}
