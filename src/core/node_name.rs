//! Node display names
//!
//! Every node shows a short name on its display. The name is picked once per
//! boot from a fixed list, using a seed supplied by the platform (hardware RNG
//! or the low bytes of the own address).

/// Built-in name list
pub const NODE_NAMES: [&str; 50] = [
    "TinyRx", "Jumpa", "Cacto", "Fossy", "Scale", "NomNom", "Rawry", "Dippy", "Trixy", "Stompy",
    "Pebble", "Snappy", "Raptor", "Clawzy", "Spikey", "Chompy", "Zoomy", "Rocky", "Duney",
    "Fossil", "Rexie", "Crunch", "Drako", "Lizard", "Roary", "Ptero", "Dusty", "Snout", "Taily",
    "Craty", "Hoppy", "Zilla", "Scurry", "Boulder", "Ashrx", "Cliffy", "Saury", "Terra", "Nomzer",
    "Fangy", "Bronto", "Cacty", "Duner", "Jumpo", "Rumbly", "Roxy", "Fossix", "Spike", "Chomps",
    "Reezy",
];

/// Pick a name from [`NODE_NAMES`] for the given seed
pub fn pick(seed: u32) -> &'static str {
    NODE_NAMES[seed as usize % NODE_NAMES.len()]
}

/// Resolve the node name: the configured override, else a seeded pick
pub fn resolve(configured: Option<&'static str>, seed: u32) -> &'static str {
    configured.unwrap_or_else(|| pick(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_wraps_around_list() {
        assert_eq!(pick(0), "TinyRx");
        assert_eq!(pick(50), "TinyRx");
        assert_eq!(pick(49), "Reezy");
    }

    #[test]
    fn resolve_prefers_override() {
        assert_eq!(resolve(Some("Custom"), 3), "Custom");
        assert_eq!(resolve(None, 3), "Fossy");
    }
}
