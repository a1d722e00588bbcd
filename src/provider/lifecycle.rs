//! Lifecycle state machine shared by provider implementations.

// self
use crate::_prelude::*;

/// Lifecycle states of a provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProviderState {
	/// Constructed; `init` has not completed.
	#[default]
	Uninitialized,
	/// Ready to serve credentials.
	Initialized,
	/// Terminal; resources have been released.
	Closed,
}
impl ProviderState {
	/// Returns a stable label suitable for logs and error messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProviderState::Uninitialized => "uninitialized",
			ProviderState::Initialized => "initialized",
			ProviderState::Closed => "closed",
		}
	}
}
impl Display for ProviderState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Thread-safe lifecycle tracker embedded in each provider.
#[derive(Debug)]
pub struct Lifecycle {
	scheme: &'static str,
	state: RwLock<ProviderState>,
}
impl Lifecycle {
	/// Creates a tracker in [`ProviderState::Uninitialized`] for `scheme`.
	pub fn new(scheme: &'static str) -> Self {
		Self { scheme, state: RwLock::new(ProviderState::Uninitialized) }
	}

	/// Current state.
	pub fn state(&self) -> ProviderState {
		*self.state.read()
	}

	/// Fails with [`Error::InvalidState`] unless the provider is initialized.
	pub fn ensure_initialized(&self) -> Result<()> {
		match self.state() {
			ProviderState::Initialized => Ok(()),
			state => Err(self.invalid(state)),
		}
	}

	/// Checks whether setup still has to run.
	///
	/// Returns `Ok(false)` when already initialized and fails once closed.
	pub fn begin_init(&self) -> Result<bool> {
		match self.state() {
			ProviderState::Uninitialized => Ok(true),
			ProviderState::Initialized => Ok(false),
			state => Err(self.invalid(state)),
		}
	}

	/// Marks setup as complete. Fails when the provider was closed while setting up.
	pub fn finish_init(&self) -> Result<()> {
		let mut state = self.state.write();

		match *state {
			ProviderState::Closed => Err(self.invalid(ProviderState::Closed)),
			_ => {
				*state = ProviderState::Initialized;

				Ok(())
			},
		}
	}

	/// Runs [`begin_init`](Self::begin_init) and [`finish_init`](Self::finish_init) for schemes
	/// without setup work.
	pub fn initialize(&self) -> Result<()> {
		if self.begin_init()? {
			self.finish_init()?;
		}

		Ok(())
	}

	/// Moves to [`ProviderState::Closed`].
	///
	/// Returns `true` only for the transition out of [`ProviderState::Initialized`], which is
	/// when held resources need releasing.
	pub fn close(&self) -> bool {
		let mut state = self.state.write();
		let was_initialized = *state == ProviderState::Initialized;

		*state = ProviderState::Closed;

		was_initialized
	}

	fn invalid(&self, state: ProviderState) -> Error {
		Error::InvalidState { scheme: self.scheme, state }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn transitions_follow_the_state_machine() {
		let lifecycle = Lifecycle::new("test");

		assert_eq!(lifecycle.state(), ProviderState::Uninitialized);
		assert!(matches!(
			lifecycle.ensure_initialized(),
			Err(Error::InvalidState { scheme: "test", state: ProviderState::Uninitialized })
		));

		lifecycle.initialize().expect("First initialization should succeed.");
		lifecycle.initialize().expect("Repeated initialization should be a no-op.");
		lifecycle.ensure_initialized().expect("Initialized provider should be usable.");

		assert!(lifecycle.close());
		assert!(!lifecycle.close());
		assert_eq!(lifecycle.state(), ProviderState::Closed);
		assert!(matches!(
			lifecycle.initialize(),
			Err(Error::InvalidState { state: ProviderState::Closed, .. })
		));
	}

	#[test]
	fn close_before_init_is_terminal_without_release() {
		let lifecycle = Lifecycle::new("test");

		assert!(!lifecycle.close());
		assert_eq!(lifecycle.state(), ProviderState::Closed);
	}

	#[test]
	fn close_during_setup_wins() {
		let lifecycle = Lifecycle::new("test");

		assert!(lifecycle.begin_init().expect("Setup should be required."));
		lifecycle.close();

		assert!(lifecycle.finish_init().is_err());
		assert_eq!(lifecycle.state(), ProviderState::Closed);
	}
}
