pub struct Icons;

impl Icons {
    pub const BRAIN: &str = "🧠";
    pub const SEARCH: &str = "🔍";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const LINK: &str = "🔗";
    pub const BOOK: &str = "📖";
    pub const PERSON: &str = "👤";
    pub const DEL: &str = "🗑️";
    pub const SUCCESS: &str = "🟢";
    pub const FAILURE: &str = "🔴";
    pub const OTHER: &str = "🟠";
    pub const EMPTY: &str = "∅";
}
