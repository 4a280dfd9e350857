pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 10;

pub const SHOPPING_LIST_FILE_NAME: &str = "shopping_list.txt";

/* curated measurement units used by the ingredient catalog */
pub const MEASUREMENT_UNITS: &[&str] = &[
    "г",
    "кг",
    "мл",
    "л",
    "шт.",
    "ст. л.",
    "ч. л.",
    "по вкусу",
];
