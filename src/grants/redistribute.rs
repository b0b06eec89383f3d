//! Per-database account fragments
//!
//! Turns the parsed account model into one SQL fragment per database. A
//! fragment recreates every account that holds a grant on that database with
//! `CREATE USER IF NOT EXISTS` (once per host, carrying the chosen credential)
//! and then replays that account's grants on the database with any credential
//! clause stripped. Accounts without database-scoped grants never appear.

use std::collections::{BTreeMap, BTreeSet};

use super::parser::{parse_accounts, UserRecord};
use super::token::strip_credentials;
use crate::report::Reporter;

/// Result of splitting one account export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redistribution {
    /// Database name to SQL fragment
    pub fragments: BTreeMap<String, String>,
    /// Every `name@host` identity referenced by the export
    pub identities: Vec<String>,
}

impl Redistribution {
    /// The fragment for `database`, if any account holds grants on it
    pub fn fragment_for(&self, database: &str) -> Option<&str> {
        self.fragments.get(database).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.identities.is_empty()
    }
}

/// Escape a value for a single-quoted SQL string literal
pub fn escape_sql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// The idempotent creation statement for `name@host`
pub fn create_user_statement(name: &str, host: &str, password: Option<&str>) -> String {
    match password {
        Some(hash) => format!(
            "CREATE USER IF NOT EXISTS '{}'@'{}' IDENTIFIED BY PASSWORD '{}';",
            escape_sql(name),
            escape_sql(host),
            escape_sql(hash)
        ),
        None => format!(
            "CREATE USER IF NOT EXISTS '{}'@'{}';",
            escape_sql(name),
            escape_sql(host)
        ),
    }
}

fn user_block(user: &UserRecord, database: &str) -> String {
    let mut block = String::new();
    for host in &user.hosts {
        block.push_str(&create_user_statement(&user.name, host, user.chosen_password()));
        block.push('\n');
    }
    for grant in user.grants_on(database) {
        let stripped = strip_credentials(&grant.raw);
        let stripped = stripped.trim();
        if stripped.is_empty() {
            continue;
        }
        block.push_str(stripped);
        if !stripped.ends_with(';') {
            block.push(';');
        }
        block.push('\n');
    }
    block.trim_end_matches('\n').to_string()
}

/// Split an account export into per-database fragments
pub fn redistribute(export: &str, reporter: &dyn Reporter) -> Redistribution {
    if export.trim().is_empty() {
        return Redistribution::default();
    }

    let users = parse_accounts(export, reporter);
    let identities = identities_of(&users);
    let mut fragments: BTreeMap<String, String> = BTreeMap::new();

    for user in users.values() {
        if user.databases.is_empty() {
            continue;
        }
        if user.has_divergent_passwords() {
            reporter.warn(&format!(
                "Account '{}' uses different credentials per host; \
                 recreating all hosts with the first",
                user.name
            ));
        }
        for database in &user.databases {
            let block = user_block(user, database);
            if block.is_empty() {
                continue;
            }
            let fragment = fragments.entry(database.clone()).or_default();
            if !fragment.is_empty() {
                fragment.push_str("\n\n");
            }
            fragment.push_str(&block);
        }
    }

    Redistribution {
        fragments,
        identities,
    }
}

fn identities_of(users: &BTreeMap<String, UserRecord>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut identities = Vec::new();
    for user in users.values() {
        for host in &user.hosts {
            let identity = format!("{}@{}", user.name, host);
            if seen.insert(identity.clone()) {
                identities.push(identity);
            }
        }
    }
    identities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;

    const EXPORT: &str = "CREATE USER 'u1'@'%' IDENTIFIED BY PASSWORD 'x';\n\
                          GRANT ALL ON `db1`.* TO 'u1'@'%';\n\
                          CREATE USER 'u2'@'localhost';\n\
                          GRANT SELECT ON `db2`.* TO 'u2'@'localhost';\n\
                          GRANT ALL ON `db1`.* TO 'u2'@'localhost';\n";

    #[test]
    fn test_empty_input_yields_nothing() {
        let reporter = MemoryReporter::new();
        assert!(redistribute("", &reporter).is_empty());
        assert!(reporter.entries().is_empty());
    }

    #[test]
    fn test_fragments_only_hold_their_database() {
        let reporter = MemoryReporter::new();
        let out = redistribute(EXPORT, &reporter);

        let db1 = out.fragment_for("db1").unwrap();
        assert!(db1.contains("CREATE USER IF NOT EXISTS 'u1'@'%' IDENTIFIED BY PASSWORD 'x';"));
        assert!(db1.contains("CREATE USER IF NOT EXISTS 'u2'@'localhost';"));
        assert!(db1.contains("GRANT ALL ON `db1`.* TO 'u1'@'%';"));
        assert!(db1.contains("GRANT ALL ON `db1`.* TO 'u2'@'localhost';"));
        assert!(!db1.contains("ON `db2`."));

        let db2 = out.fragment_for("db2").unwrap();
        assert!(db2.contains("CREATE USER IF NOT EXISTS 'u2'@'localhost';"));
        assert!(db2.contains("GRANT SELECT ON `db2`.* TO 'u2'@'localhost';"));
        assert!(!db2.contains("'u1'"));
        assert!(!db2.contains("ON `db1`."));
    }

    #[test]
    fn test_identities_cover_every_account() {
        let reporter = MemoryReporter::new();
        let out = redistribute(EXPORT, &reporter);
        let mut identities = out.identities.clone();
        identities.sort();
        assert_eq!(identities, vec!["u1@%".to_string(), "u2@localhost".to_string()]);
    }

    #[test]
    fn test_global_only_account_is_omitted() {
        let reporter = MemoryReporter::new();
        let export = "CREATE USER 'admin'@'%' IDENTIFIED BY PASSWORD '*ROOT';\n\
                      GRANT ALL PRIVILEGES ON *.* TO 'admin'@'%' WITH GRANT OPTION;\n";
        let out = redistribute(export, &reporter);
        assert!(out.fragments.is_empty());
        assert_eq!(out.identities, vec!["admin@%".to_string()]);
    }

    #[test]
    fn test_grant_credentials_are_stripped() {
        let reporter = MemoryReporter::new();
        let export = "GRANT SELECT ON shop.* TO 'app'@'%' IDENTIFIED BY PASSWORD '*H'\n";
        let out = redistribute(export, &reporter);
        let shop = out.fragment_for("shop").unwrap();
        assert!(shop.contains("CREATE USER IF NOT EXISTS 'app'@'%' IDENTIFIED BY PASSWORD '*H';"));
        assert!(shop.contains("GRANT SELECT ON shop.* TO 'app'@'%';"));
        assert_eq!(shop.matches("IDENTIFIED BY PASSWORD").count(), 1);
    }

    #[test]
    fn test_escape_sql() {
        assert_eq!(escape_sql("o'brien"), "o''brien");
        assert_eq!(escape_sql("a\\b"), "a\\\\b");
        assert_eq!(
            create_user_statement("o'b", "%", None),
            "CREATE USER IF NOT EXISTS 'o''b'@'%';"
        );
    }

    #[test]
    fn test_divergent_host_passwords_warn() {
        let reporter = MemoryReporter::new();
        let export = "CREATE USER 'app'@'a' IDENTIFIED BY PASSWORD '*ONE';\n\
                      CREATE USER 'app'@'b' IDENTIFIED BY PASSWORD '*TWO';\n\
                      GRANT ALL ON `db`.* TO 'app'@'a';\n";
        let out = redistribute(export, &reporter);
        let db = out.fragment_for("db").unwrap();
        assert_eq!(db.matches("IDENTIFIED BY PASSWORD '*ONE'").count(), 2);
        assert_eq!(reporter.warnings().len(), 1);
    }
}
