pub use crate::async_task::{AsyncState, AsyncStatus, AsyncTask, async_state, produce_async};
pub use crate::effects::{Dispose, effect, on_unmount};
pub use crate::effects_ext::disposable_effect;
pub use crate::error::{SurfaceError, TaskError};
pub use crate::lifecycle::{lifecycle_effect, mount_effect, unmount_effect};
pub use crate::locals::{Spawner, current_spawner, local, provide_local, with_spawner};
pub use crate::modal::{ModalRegistry, ModalState, remember_modal_registry};
pub use crate::runtime::{
    Surface, remember, remember_state, remember_state_with_key, remember_with_key,
    remember_with_seed,
};
pub use crate::scope::{Scope, current_scope, scoped_effect};
pub use crate::signal::{Signal, signal};
pub use crate::synced::{SyncedRef, remember_synced};
