//! Fixed TIGER/Line lookup tables.

/// Square meters to square miles.
pub const SQ_METERS_TO_SQ_MILES: f64 = 3.86102e-7;

/// Postal codes of the states and territories outside the contiguous US.
pub const NON_CONTINENTAL: [&str; 7] = ["HI", "VI", "MP", "GU", "AK", "AS", "PR"];

/// Census regions, in code order.
pub const REGIONS: [(u8, &str); 5] = [
    (1, "Northeast"),
    (2, "Midwest"),
    (3, "South"),
    (4, "West"),
    (9, "Puerto Rico and the Island Areas"),
];

/// Regions that contain continental states.
pub const CONTINENTAL_REGIONS: [u8; 4] = [1, 2, 3, 4];

/// Census divisions, in code order.
pub const DIVISIONS: [(u8, &str); 10] = [
    (0, "Puerto Rico and the Island Areas"),
    (1, "New England"),
    (2, "Middle Atlantic"),
    (3, "East North Central"),
    (4, "West North Central"),
    (5, "South Atlantic"),
    (6, "East South Central"),
    (7, "West South Central"),
    (8, "Mountain"),
    (9, "Pacific"),
];

pub fn region_name(code: u8) -> Option<&'static str> {
    REGIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

pub fn division_name(code: u8) -> Option<&'static str> {
    DIVISIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

pub fn is_non_continental(stusps: &str) -> bool {
    NON_CONTINENTAL.contains(&stusps)
}
