//! The fixed 42-territory world map.

/// Number of territories on the board.
pub const TERRITORY_COUNT: usize = 42;

/// Plaintext territory index, `0..TERRITORY_COUNT`.
pub type TerritoryId = usize;

const NAMES: [&str; TERRITORY_COUNT] = [
    "Alaska",
    "Northwest Territory",
    "Greenland",
    "Alberta",
    "Ontario",
    "Quebec",
    "Western United States",
    "Eastern United States",
    "Central America",
    "Venezuela",
    "Peru",
    "Brazil",
    "Argentina",
    "Iceland",
    "Great Britain",
    "Scandinavia",
    "Northern Europe",
    "Western Europe",
    "Southern Europe",
    "Ukraine",
    "North Africa",
    "Egypt",
    "East Africa",
    "Congo",
    "South Africa",
    "Madagascar",
    "Ural",
    "Siberia",
    "Yakutsk",
    "Kamchatka",
    "Irkutsk",
    "Mongolia",
    "Japan",
    "Afghanistan",
    "China",
    "Middle East",
    "India",
    "Siam",
    "Indonesia",
    "New Guinea",
    "Western Australia",
    "Eastern Australia",
];

/// Undirected borders, each listed once with the lower index first.
const BORDERS: [(TerritoryId, TerritoryId); 83] = [
    (0, 1), (0, 3), (0, 29), (1, 2), (1, 3), (1, 4), (2, 4), (2, 5), (2, 13), (3, 4),
    (3, 6), (4, 5), (4, 6), (4, 7), (5, 7), (6, 7), (6, 8), (7, 8), (8, 9), (9, 10),
    (9, 11), (10, 11), (10, 12), (11, 12), (11, 20), (13, 14), (13, 15), (14, 15), (14, 16), (14, 17),
    (15, 16), (15, 19), (16, 17), (16, 18), (16, 19), (17, 18), (17, 20), (18, 19), (18, 20), (18, 21),
    (18, 35), (19, 26), (19, 33), (19, 35), (20, 21), (20, 22), (20, 23), (21, 22), (21, 35), (22, 23),
    (22, 24), (22, 25), (22, 35), (23, 24), (24, 25), (26, 27), (26, 33), (26, 34), (27, 28), (27, 30),
    (27, 31), (27, 34), (28, 29), (28, 30), (29, 30), (29, 31), (29, 32), (30, 31), (31, 32), (31, 34),
    (33, 34), (33, 35), (33, 36), (34, 36), (34, 37), (35, 36), (36, 37), (37, 38), (38, 39), (38, 40),
    (39, 40), (39, 41), (40, 41),
];

/// Name of a territory, or `None` if the index is out of range.
#[must_use]
pub fn name(id: TerritoryId) -> Option<&'static str> {
    NAMES.get(id).copied()
}

/// Territories sharing a border with `id`.
pub fn neighbors(id: TerritoryId) -> impl Iterator<Item = TerritoryId> {
    BORDERS.iter().filter_map(move |&(a, b)| {
        if a == id {
            Some(b)
        } else if b == id {
            Some(a)
        } else {
            None
        }
    })
}
