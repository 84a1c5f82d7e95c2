#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure bootstrap system that prepares the Combine Rush experience.

use combine_rush_world::{query, World};

/// Produces data required to greet the player.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Derives the banner that should be shown when the experience starts.
    #[must_use]
    pub fn welcome_banner(&self, world: &World) -> &'static str {
        query::welcome_banner(world)
    }

    /// Exposes the name of the loaded level for presentation purposes.
    #[must_use]
    pub fn level_name<'world>(&self, world: &'world World) -> Option<&'world str> {
        query::level_name(world)
    }

    /// Exposes the play grid dimensions required for rendering.
    #[must_use]
    pub fn grid_dimensions(&self, world: &World) -> (u32, u32) {
        query::grid_dimensions(world)
    }
}

#[cfg(test)]
mod tests {
    use super::Bootstrap;
    use combine_rush_world::World;

    #[test]
    fn banner_matches_the_core_constant() {
        let world = World::new();
        let bootstrap = Bootstrap;
        assert_eq!(bootstrap.welcome_banner(&world), "Welcome to Combine Rush.");
    }

    #[test]
    fn empty_session_has_no_level() {
        let world = World::new();
        let bootstrap = Bootstrap;
        assert_eq!(bootstrap.level_name(&world), None);
        assert_eq!(bootstrap.grid_dimensions(&world), (0, 0));
    }
}
