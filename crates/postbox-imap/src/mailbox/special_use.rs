//! Special-use mailbox detection (RFC 6154).

use std::collections::HashMap;

/// Recognized special-use flags, in canonical spelling.
pub const SPECIAL_USE_FLAGS: [&str; 7] = [
    "\\All", "\\Archive", "\\Drafts", "\\Flagged", "\\Junk", "\\Sent", "\\Trash",
];

const SENT_NAMES: &[&str] = &[
    "sent", "sent items", "sent messages", "sent mail", "gesendet", "gesendete elemente",
    "gesendete objekte", "envoyés", "messages envoyés", "éléments envoyés", "enviados",
    "enviadas", "elementos enviados", "inviati", "posta inviata", "verzonden",
    "verzonden items", "skickat", "skickade objekt", "sendt", "sendte elementer",
    "lähetetyt", "wysłane", "odeslané", "elküldött", "gönderilmiş öğeler", "отправленные",
    "надіслані", "изпратени", "σταλθέντα", "נשלחו", "المرسلة", "已发送", "寄件備份",
    "送信済み", "보낸 편지함",
];

const TRASH_NAMES: &[&str] = &[
    "trash", "bin", "deleted", "deleted items", "deleted messages", "papierkorb",
    "gelöschte elemente", "gelöschte objekte", "corbeille", "éléments supprimés", "papelera",
    "elementos eliminados", "cestino", "elementi eliminati", "prullenbak",
    "verwijderde items", "papperskorgen", "borttagna objekt", "papirkurv",
    "slettede elementer", "roskakori", "poistetut", "kosz", "usunięte wiadomości", "koš",
    "odstraněné položky", "törölt elemek", "çöp kutusu", "silinmiş öğeler", "корзина",
    "удаленные", "видалені", "κάδος απορριμμάτων", "praht", "prügikast", "פח",
    "العناصر المحذوفة", "已删除", "已刪除項目", "ごみ箱", "휴지통",
];

const JUNK_NAMES: &[&str] = &[
    "junk", "junk e-mail", "junk mail", "spam", "bulk mail", "spamverdacht", "courrier indésirable",
    "pourriel", "correo no deseado", "no deseado", "posta indesiderata", "ongewenste e-mail",
    "skräppost", "søppelpost", "roskaposti", "levélszemét", "nevyžádaná pošta", "istenmeyen",
    "спам", "垃圾邮件", "迷惑メール", "스팸",
];

const DRAFTS_NAMES: &[&str] = &[
    "drafts", "draft", "entwürfe", "brouillons", "borradores", "bozze", "concepten",
    "utkast", "kladder", "luonnokset", "wersje robocze", "koncepty", "piszkozatok",
    "taslaklar", "черновики", "чернетки", "טיוטות", "المسودات", "草稿", "下書き", "임시 보관함",
];

const ARCHIVE_NAMES: &[&str] = &["archive", "archives", "archiv", "archivio", "archivo", "arkiv"];

/// Maps mailbox display names to special-use flags when the server does not
/// advertise any.
#[derive(Debug, Clone)]
pub struct SpecialUseTable {
    names: HashMap<String, &'static str>,
}

impl SpecialUseTable {
    /// A table with no localized names; only server flags are honored.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// Adds or replaces a localized name. Returns `false` (and changes
    /// nothing) if `flag` is not a recognized special-use flag.
    pub fn insert(&mut self, name: &str, flag: &str) -> bool {
        match canonical_flag(flag) {
            Some(flag) => {
                self.names.insert(normalize(name), flag);
                true
            }
            None => false,
        }
    }

    /// Returns the special-use flag of a mailbox.
    ///
    /// The first recognized flag in `flags` wins; otherwise the trimmed,
    /// lower-cased `name` is looked up in the table.
    #[must_use]
    pub fn check(&self, flags: &[String], name: &str) -> Option<&'static str> {
        flags
            .iter()
            .find_map(|flag| canonical_flag(flag))
            .or_else(|| self.names.get(&normalize(name)).copied())
    }
}

impl Default for SpecialUseTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (flag, names) in [
            ("\\Sent", SENT_NAMES),
            ("\\Trash", TRASH_NAMES),
            ("\\Junk", JUNK_NAMES),
            ("\\Drafts", DRAFTS_NAMES),
            ("\\Archive", ARCHIVE_NAMES),
        ] {
            for name in names {
                table.insert(name, flag);
            }
        }
        table
    }
}

fn canonical_flag(flag: &str) -> Option<&'static str> {
    SPECIAL_USE_FLAGS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(flag))
        .copied()
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins() {
        let table = SpecialUseTable::default();
        let flags = vec!["test".to_string(), "\\All".to_string()];
        assert_eq!(table.check(&flags, "Trash"), Some("\\All"));
        assert_eq!(table.check(&["\\trash".to_string()], "x"), Some("\\Trash"));
    }

    #[test]
    fn test_unknown_flag_and_name() {
        let table = SpecialUseTable::default();
        assert_eq!(table.check(&["test".to_string()], "test"), None);
        assert_eq!(table.check(&[], ""), None);
    }

    #[test]
    fn test_localized_names() {
        let table = SpecialUseTable::default();
        assert_eq!(table.check(&[], "Praht"), Some("\\Trash"));
        assert_eq!(table.check(&[], "  Gesendet "), Some("\\Sent"));
        assert_eq!(table.check(&[], "ENTWÜRFE"), Some("\\Drafts"));
    }

    #[test]
    fn test_custom_table() {
        let mut table = SpecialUseTable::empty();
        assert_eq!(table.check(&[], "Praht"), None);
        assert!(table.insert("Outbox Copies", "\\sent"));
        assert!(!table.insert("Stuff", "\\Important"));
        assert_eq!(table.check(&[], "outbox copies"), Some("\\Sent"));
        assert_eq!(table.check(&[], "stuff"), None);
    }
}
