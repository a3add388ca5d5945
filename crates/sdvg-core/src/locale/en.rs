use super::Locale;
use crate::config::LocaleCode;

pub(super) static LOCALE: Locale = Locale {
    code: LocaleCode::En,
    first_names: FIRST_NAMES,
    last_names: LAST_NAMES,
    words: WORDS,
    phone_pattern: "+1 (###) ###-####",
};

static FIRST_NAMES: &[&str] = &[
    "Aaron", "Alice", "Amelia", "Andrew", "Anna", "Arthur", "Benjamin", "Brian", "Caroline",
    "Charles", "Charlotte", "Chloe", "Daniel", "David", "Diana", "Edward", "Eleanor", "Emily",
    "Emma", "Ethan", "Evelyn", "Frank", "George", "Grace", "Hannah", "Harry", "Helen", "Henry",
    "Isabella", "Jack", "James", "Jane", "Joseph", "Julia", "Kevin", "Laura", "Liam", "Lily",
    "Lucas", "Margaret", "Mary", "Mason", "Michael", "Nancy", "Noah", "Oliver", "Olivia",
    "Patrick", "Peter", "Rachel", "Richard", "Robert", "Samuel", "Sarah", "Sophia", "Steven",
    "Thomas", "Victoria", "Walter", "William",
];

static LAST_NAMES: &[&str] = &[
    "Adams", "Allen", "Anderson", "Bailey", "Baker", "Bell", "Bennett", "Brooks", "Brown",
    "Campbell", "Carter", "Clark", "Collins", "Cook", "Cooper", "Cox", "Davis", "Edwards",
    "Evans", "Foster", "Garcia", "Gray", "Green", "Hall", "Harris", "Hill", "Howard", "Hughes",
    "Jackson", "James", "Johnson", "Jones", "Kelly", "King", "Lee", "Lewis", "Long", "Martin",
    "Miller", "Mitchell", "Moore", "Morgan", "Morris", "Murphy", "Nelson", "Parker", "Perry",
    "Peterson", "Phillips", "Powell", "Price", "Reed", "Richardson", "Roberts", "Robinson",
    "Rogers", "Ross", "Russell", "Sanders", "Scott", "Smith", "Stewart", "Taylor", "Thomas",
    "Thompson", "Turner", "Walker", "Ward", "Watson", "White", "Williams", "Wilson", "Wood",
    "Wright", "Young",
];

static WORDS: &[&str] = &[
    "about", "after", "again", "along", "begin", "below", "bird", "blue", "bright", "carry",
    "clean", "clear", "cloud", "cold", "dark", "deep", "early", "earth", "every", "field",
    "first", "fresh", "glass", "grass", "great", "green", "happy", "heavy", "house", "large",
    "light", "little", "long", "move", "night", "north", "ocean", "open", "order", "paper",
    "place", "plain", "quick", "quiet", "rain", "river", "round", "sharp", "short", "silver",
    "small", "smooth", "south", "spring", "stone", "storm", "summer", "sweet", "table", "think",
    "under", "warm", "water", "white", "window", "winter", "world", "yellow", "young",
];
