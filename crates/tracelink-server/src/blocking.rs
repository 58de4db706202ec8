use tracelink_store::StoreError;

/// Run synchronous store work off the async executor.
///
/// A panicked or cancelled task surfaces as [`StoreError::Unavailable`].
pub async fn run_blocking<T, E, F>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<StoreError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(join) => Err(E::from(StoreError::Unavailable(format!("blocking task: {join}")))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_closure_result() {
        let out: Result<i32, StoreError> = run_blocking(|| Ok(41 + 1)).await;
        assert_eq!(out.unwrap(), 42);
    }

    #[tokio::test]
    async fn panic_becomes_unavailable() {
        let out: Result<(), StoreError> = run_blocking(|| panic!("boom")).await;
        assert!(matches!(out, Err(StoreError::Unavailable(_))));
    }
}
