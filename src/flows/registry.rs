//! Name-keyed registry hosts use to route requests to strategies.

// self
use crate::{
	_prelude::*,
	auth::StrategyName,
	error::ConfigError,
	flows::AuthenticationStrategy,
};

/// Shared strategy handle stored in a [`StrategyRegistry`].
pub type SharedStrategy<U> = Arc<dyn AuthenticationStrategy<User = U>>;

/// Strategies producing the same user type, keyed by name.
pub struct StrategyRegistry<U> {
	strategies: HashMap<StrategyName, SharedStrategy<U>>,
}
impl<U> StrategyRegistry<U> {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self { strategies: HashMap::new() }
	}

	/// Registers `strategy` under its own [`AuthenticationStrategy::name`].
	///
	/// Returns the strategy previously registered under that name, if any.
	pub fn register(&mut self, strategy: SharedStrategy<U>) -> Result<Option<SharedStrategy<U>>> {
		let name = StrategyName::new(strategy.name()).map_err(ConfigError::from)?;

		Ok(self.strategies.insert(name, strategy))
	}

	/// Registers `strategy` under an explicit name, e.g. to mount two QQ apps side by side.
	pub fn register_as(
		&mut self,
		name: impl AsRef<str>,
		strategy: SharedStrategy<U>,
	) -> Result<Option<SharedStrategy<U>>> {
		let name = StrategyName::new(name).map_err(ConfigError::from)?;

		Ok(self.strategies.insert(name, strategy))
	}

	/// Looks up a strategy by name.
	pub fn get(&self, name: &str) -> Option<SharedStrategy<U>> {
		self.strategies.get(name).cloned()
	}

	/// Removes a strategy by name.
	pub fn unregister(&mut self, name: &str) -> Option<SharedStrategy<U>> {
		self.strategies.remove(name)
	}

	/// Registered names in arbitrary order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.strategies.keys().map(|name| name.as_ref())
	}

	/// Number of registered strategies.
	pub fn len(&self) -> usize {
		self.strategies.len()
	}

	/// Returns `true` when no strategy is registered.
	pub fn is_empty(&self) -> bool {
		self.strategies.is_empty()
	}
}
impl<U> Default for StrategyRegistry<U> {
	fn default() -> Self {
		Self::new()
	}
}
impl<U> Debug for StrategyRegistry<U> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StrategyRegistry")
			.field("strategies", &self.strategies.keys().collect::<Vec<_>>())
			.finish()
	}
}
