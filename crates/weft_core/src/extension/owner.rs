//! Extensible owner contracts.

/// Contract implemented by every framework type whose behavior can be
/// extended through the registry.
///
/// # Contract
/// - `Hooks` is the hook trait object type dispatched by this owner's
///   chains; the synthesized local hook implementing the owner's base
///   behavior is always the terminal chain link.
/// - `type_lineage()` lists the owner's registry type keys from most
///   specific to least; registrations may target any lineage member. The
///   lineage must not be empty and is fixed for the life of the process.
/// - `container_path()` lists the anchor ids of the containers the instance
///   is nested in, outermost first. Scoped registrations apply only when
///   their anchor appears in this path. The path must be fixed before the
///   first extensible operation is dispatched.
pub trait Extensible: 'static {
    /// Hook trait object type dispatched by this owner's chains.
    type Hooks: ?Sized + 'static;

    /// Registry type keys for this owner, most specific first.
    fn type_lineage() -> &'static [&'static str]
    where
        Self: Sized;

    /// Container anchor ids this instance is nested in, outermost first.
    fn container_path(&self) -> &[String];
}
