use crate::{SyncedRef, current_scope, remember_with_seed};

type Callback = Box<dyn FnOnce()>;

struct Mounted;

/// Runs `f` once, on the first pass of the owning surface.
pub fn mount_effect(f: impl FnOnce()) {
    let (_, existing) = remember_with_seed((), |()| Mounted);
    if existing.is_none() {
        f();
    }
}

/// Runs the most recently passed `f` once, when the owning surface is torn down.
///
/// Every pass replaces the stored callback, so the cleanup sees the values
/// captured by the last pass rather than the first.
pub fn unmount_effect(f: impl FnOnce() + 'static) {
    let (latest, unused) = remember_with_seed(Box::new(f) as Callback, |f| {
        SyncedRef::new(Some(f))
    });

    match unused {
        Some(f) => latest.set(Some(f)),
        None => match current_scope() {
            Some(scope) => scope.add_disposer(move || {
                if let Some(f) = latest.take() {
                    f();
                }
            }),
            None => log::debug!("unmount_effect outside of a surface; callback will not run"),
        },
    }
}

/// `mount_effect(on_acquire)` followed by `unmount_effect(on_release)`.
pub fn lifecycle_effect(on_acquire: impl FnOnce(), on_release: impl FnOnce() + 'static) {
    mount_effect(on_acquire);
    unmount_effect(on_release);
}
