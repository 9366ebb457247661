/// Owner of the active scene: at most one scene is mounted at a time, and
/// selecting a new one always tears the previous one down first.
use std::rc::Rc;

use rand::{Rng, SeedableRng};

use crate::environment::Environment;
use crate::error::SceneError;
use crate::kind::SceneKind;
use crate::lifecycle::SceneHandle;
use crate::scenes::SceneRng;

pub struct SceneHost<E: Environment + 'static> {
    env: Rc<E>,
    active: Option<SceneHandle<E>>,
    /// Last kind asked for, kept across `unmount` so the host can resume
    requested: Option<SceneKind>,
    seeds: SceneRng,
}

impl<E: Environment + 'static> SceneHost<E> {
    /// Idle host with a fixed seed sequence
    pub fn new(env: Rc<E>) -> Self {
        Self::with_seed(env, 0x5eed_cafe)
    }

    pub fn with_seed(env: Rc<E>, seed: u64) -> Self {
        Self {
            env,
            active: None,
            requested: None,
            seeds: SceneRng::seed_from_u64(seed),
        }
    }

    /// Idle host that immediately mounts the default scene
    pub fn start(env: Rc<E>, seed: u64) -> Result<Self, SceneError> {
        let mut host = Self::with_seed(env, seed);
        host.select(SceneKind::default())?;
        Ok(host)
    }

    /// Make `kind` the active scene.
    ///
    /// The previous scene is fully disposed before the new one is built, so
    /// the container never holds two surfaces. Selecting the active kind
    /// rebuilds it. On error the host is left with no active scene.
    pub fn select(&mut self, kind: SceneKind) -> Result<(), SceneError> {
        if let Some(mut previous) = self.active.take() {
            log::debug!("switching {} -> {kind}", previous.kind());
            previous.dispose();
        }
        self.requested = Some(kind);

        let seed = self.seeds.gen::<u64>();
        match SceneHandle::mount(Rc::clone(&self.env), kind, seed) {
            Ok(handle) => {
                self.active = Some(handle);
                Ok(())
            }
            Err(e) => {
                log::warn!("failed to mount {kind} scene: {e}");
                Err(e)
            }
        }
    }

    /// Select a scene by its name, as used by the toolbar and the CLI
    pub fn select_named(&mut self, name: &str) -> Result<(), SceneError> {
        self.select(name.parse()?)
    }

    /// Remount the last requested scene (or the default) after an
    /// `unmount`. Does nothing while a scene is active.
    pub fn resume(&mut self) -> Result<(), SceneError> {
        if self.active.is_some() {
            return Ok(());
        }
        self.select(self.requested.unwrap_or_default())
    }

    /// Kind the host last tried to mount, whether or not it is still active
    pub fn requested(&self) -> Option<SceneKind> {
        self.requested
    }

    /// Dispose the active scene, if any
    pub fn unmount(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.dispose();
        }
    }

    pub fn active(&self) -> Option<SceneKind> {
        self.active.as_ref().map(SceneHandle::kind)
    }

    pub fn handle(&self) -> Option<&SceneHandle<E>> {
        self.active.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut SceneHandle<E>> {
        self.active.as_mut()
    }

    pub fn environment(&self) -> &Rc<E> {
        &self.env
    }
}

impl<E: Environment + 'static> Drop for SceneHost<E> {
    fn drop(&mut self) {
        self.unmount();
    }
}
