//! Value pools for generated records

pub const CUSTOMER_SEGMENTS: [&str; 4] = ["VIP", "REGULAR", "NEW", "INACTIVE"];

pub const ORDER_STATUSES: [&str; 4] = ["PENDING", "COMPLETED", "CANCELLED", "REFUNDED"];

/// Statuses the staging layer flags as invalid
pub const INVALID_ORDER_STATUSES: [&str; 3] = ["PROCESSING", "SHIPPED", "UNKNOWN"];

pub const PAYMENT_METHODS: [&str; 4] = ["CREDIT_CARD", "DEBIT_CARD", "PAYPAL", "BANK_TRANSFER"];

pub const EVENT_TYPES: [&str; 5] = ["PAGE_VIEW", "ADD_TO_CART", "PURCHASE", "SEARCH", "CLICK"];

/// Event types the staging layer flags as invalid
pub const INVALID_EVENT_TYPES: [&str; 3] = ["LOGIN", "LOGOUT", "UNKNOWN"];

pub const DEVICE_TYPES: [&str; 3] = ["DESKTOP", "MOBILE", "TABLET"];

pub const FIRST_NAMES: [&str; 24] = [
    "Ava", "Liam", "Olivia", "Noah", "Emma", "Lucas", "Mia", "Ethan",
    "Sofia", "Mateo", "Chloe", "Hiroshi", "Amara", "Ravi", "Ingrid", "Tomas",
    "Leila", "Kwame", "Yuki", "Elena", "Omar", "Grace", "Diego", "Hana",
];

pub const LAST_NAMES: [&str; 24] = [
    "Smith", "Johnson", "Garcia", "Muller", "Rossi", "Tanaka", "Okafor", "Silva",
    "Nguyen", "Kowalski", "Dubois", "Patel", "Andersen", "Cohen", "Novak", "Haddad",
    "Lopez", "Kim", "Brown", "Schmidt", "Moreau", "Ito", "Mensah", "Costa",
];

pub const EMAIL_DOMAINS: [&str; 5] = [
    "example.com", "example.org", "example.net", "mail.test", "shop.test",
];

/// (ISO 3166 alpha-2 country, city) pairs
pub const LOCATIONS: [(&str, &str); 16] = [
    ("US", "Portland"),
    ("US", "Austin"),
    ("CA", "Toronto"),
    ("GB", "Leeds"),
    ("DE", "Hamburg"),
    ("FR", "Lyon"),
    ("ES", "Valencia"),
    ("IT", "Turin"),
    ("NL", "Utrecht"),
    ("SE", "Malmo"),
    ("PL", "Krakow"),
    ("BR", "Curitiba"),
    ("JP", "Osaka"),
    ("IN", "Pune"),
    ("AU", "Perth"),
    ("ZA", "Durban"),
];

/// Highest product number referenced by events (`PROD0001..=PROD0500`)
pub const PRODUCT_COUNT: u32 = 500;

/// Highest session number referenced by events
pub const SESSION_COUNT: u32 = 1000;

/// Highest page number in `/page/<n>`
pub const PAGE_COUNT: u32 = 100;
