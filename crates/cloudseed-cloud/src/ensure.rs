//! Idempotent ensure-exists
//!
//! Every provisioning step (container, database, collection, document) is a
//! lookup keyed on a stable identifier followed by a create when the lookup
//! comes back empty. [`ensure`] is that pattern, parameterized by the two
//! calls it wraps.

use std::future::Future;

/// Outcome of [`ensure`]: which branch produced the resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned<T> {
    /// The lookup found the resource; nothing was created
    Existing(T),
    /// The lookup came back empty and the resource was created
    Created(T),
}

impl<T> Provisioned<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Provisioned::Created(_))
    }

    pub fn resource(&self) -> &T {
        match self {
            Provisioned::Existing(r) | Provisioned::Created(r) => r,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Provisioned::Existing(r) | Provisioned::Created(r) => r,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Provisioned<U> {
        match self {
            Provisioned::Existing(r) => Provisioned::Existing(f(r)),
            Provisioned::Created(r) => Provisioned::Created(f(r)),
        }
    }
}

/// Ensure a resource exists, creating it from `spec` only if `lookup` finds nothing.
///
/// Errors from either call are returned unchanged. There is no retry and no
/// attempt to tell transient failures from permanent ones.
pub async fn ensure<T, S, E, L, LF, C, CF>(lookup: L, create: C, spec: S) -> Result<Provisioned<T>, E>
where
    L: FnOnce() -> LF,
    LF: Future<Output = Result<Option<T>, E>>,
    C: FnOnce(S) -> CF,
    CF: Future<Output = Result<T, E>>,
{
    if let Some(existing) = lookup().await? {
        tracing::debug!("Resource already exists, skipping create");
        return Ok(Provisioned::Existing(existing));
    }

    let created = create(spec).await?;
    Ok(Provisioned::Created(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Store {
        items: Mutex<HashMap<String, String>>,
        creates: Mutex<usize>,
    }

    impl Store {
        async fn lookup(&self, id: &str) -> Result<Option<String>, String> {
            Ok(self.items.lock().unwrap().get(id).cloned())
        }

        async fn create(&self, (id, value): (String, String)) -> Result<String, String> {
            *self.creates.lock().unwrap() += 1;
            self.items.lock().unwrap().insert(id, value.clone());
            Ok(value)
        }
    }

    #[tokio::test]
    async fn test_ensure_creates_when_absent() {
        let store = Store::default();

        let result = ensure(
            || store.lookup("photos"),
            |spec| store.create(spec),
            ("photos".to_string(), "v1".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(result, Provisioned::Created("v1".to_string()));
        assert_eq!(*store.creates.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let store = Store::default();

        for _ in 0..2 {
            ensure(
                || store.lookup("photos"),
                |spec| store.create(spec),
                ("photos".to_string(), "v1".to_string()),
            )
            .await
            .unwrap();
        }

        // The second call must not overwrite or recreate
        let second = ensure(
            || store.lookup("photos"),
            |spec| store.create(spec),
            ("photos".to_string(), "v2".to_string()),
        )
        .await
        .unwrap();

        assert!(!second.was_created());
        assert_eq!(second.into_inner(), "v1");
        assert_eq!(*store.creates.lock().unwrap(), 1);
        assert_eq!(store.items.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_propagates_lookup_error() {
        let mut create_called = false;

        let result: Result<Provisioned<String>, String> = ensure(
            || async { Err("lookup failed".to_string()) },
            |_spec: ()| {
                create_called = true;
                async { Ok("never".to_string()) }
            },
            (),
        )
        .await;

        assert_eq!(result.unwrap_err(), "lookup failed");
        assert!(!create_called);
    }

    #[tokio::test]
    async fn test_ensure_propagates_create_error() {
        let result: Result<Provisioned<String>, String> = ensure(
            || async { Ok(None) },
            |_spec: ()| async { Err("quota exceeded".to_string()) },
            (),
        )
        .await;

        assert_eq!(result.unwrap_err(), "quota exceeded");
    }

    #[test]
    fn test_provisioned_map() {
        let p = Provisioned::Created(2).map(|n| n * 10);
        assert_eq!(p, Provisioned::Created(20));
        assert_eq!(*Provisioned::Existing("a").resource(), "a");
    }
}
