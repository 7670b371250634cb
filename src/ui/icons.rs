//! Shared status icons.

use console::Emoji;

// Outcomes
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");

// Floor
pub static STATION: Emoji<'_, '_> = Emoji("🏭 ", "[S]");
pub static JOB: Emoji<'_, '_> = Emoji("📦 ", "[J]");
pub static MOVE: Emoji<'_, '_> = Emoji("➡️  ", "->");
pub static SCAN: Emoji<'_, '_> = Emoji("📷 ", "[QR]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static EXPORT: Emoji<'_, '_> = Emoji("📄 ", "+");
