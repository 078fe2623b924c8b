//! Database operations unit tests

#[cfg(test)]
mod tests {
    use crate::db::{queries, Database};

    #[test]
    fn test_setting_upsert_overwrites_value() {
        let db = Database::open_in_memory().expect("in-memory DB");
        let now = chrono::Utc::now().to_rfc3339();

        queries::upsert_setting(&db, "sound", r#"{"volume":0.5}"#, &now).unwrap();
        queries::upsert_setting(&db, "sound", r#"{"volume":0.9}"#, &now).unwrap();

        let stored = queries::get_setting(&db, "sound").unwrap();
        assert_eq!(stored.as_deref(), Some(r#"{"volume":0.9}"#));
        assert_eq!(queries::list_settings(&db).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_setting_is_none() {
        let db = Database::open_in_memory().expect("in-memory DB");
        assert!(queries::get_setting(&db, "nope").unwrap().is_none());
    }

    #[test]
    fn test_delete_setting_reports_removal() {
        let db = Database::open_in_memory().expect("in-memory DB");
        let now = chrono::Utc::now().to_rfc3339();
        queries::upsert_setting(&db, "tts", "{}", &now).unwrap();

        assert!(queries::delete_setting(&db, "tts").unwrap());
        assert!(!queries::delete_setting(&db, "tts").unwrap());
        assert!(queries::get_setting(&db, "tts").unwrap().is_none());
    }

    #[test]
    fn test_list_settings_is_sorted_by_key() {
        let db = Database::open_in_memory().expect("in-memory DB");
        let now = chrono::Utc::now().to_rfc3339();
        queries::upsert_setting(&db, "tts", "{}", &now).unwrap();
        queries::upsert_setting(&db, "keybinds", "{}", &now).unwrap();

        let keys: Vec<String> = queries::list_settings(&db)
            .unwrap()
            .into_iter()
            .map(|row| row.key)
            .collect();
        assert_eq!(keys, vec!["keybinds".to_string(), "tts".to_string()]);
    }
}
