//! Account export parser
//!
//! Scans a bulk account export line by line and aggregates every
//! `CREATE USER` and `GRANT` statement into one [`UserRecord`] per account
//! name. Anything else, including lines whose account cannot be resolved,
//! is ignored.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::token::{find_credential, find_grant_database, find_user_host};
use crate::report::Reporter;

/// One original GRANT statement and the database it targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantLine {
    /// The statement as it appeared in the export
    pub raw: String,
    /// `None` for global (`ON *.*`) or table-level grants
    pub database: Option<String>,
}

/// Everything the export says about one account name, across all hosts
#[derive(Debug, Clone, Default)]
pub struct UserRecord {
    pub name: String,
    /// Hosts in first-seen order, without duplicates
    pub hosts: Vec<String>,
    pub password_by_host: HashMap<String, String>,
    pub grants: Vec<GrantLine>,
    /// Databases with at least one database-scoped grant
    pub databases: BTreeSet<String>,
    first_password: Option<String>,
}

impl UserRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_host(&mut self, host: &str) {
        if !self.hosts.iter().any(|h| h == host) {
            self.hosts.push(host.to_string());
        }
    }

    /// Record the credential hash for `host`.
    ///
    /// A different hash for an already known `name@host` is a conflict: the
    /// first hash stays and `false` is returned.
    pub fn set_password(&mut self, host: &str, hash: &str) -> bool {
        if hash.is_empty() {
            return true;
        }
        if let Some(previous) = self.password_by_host.get(host) {
            return previous == hash;
        }
        self.password_by_host
            .insert(host.to_string(), hash.to_string());
        if self.first_password.is_none() {
            self.first_password = Some(hash.to_string());
        }
        true
    }

    /// The credential used when recreating the account on any host
    pub fn chosen_password(&self) -> Option<&str> {
        self.first_password.as_deref()
    }

    /// Whether hosts of this account carry different credential hashes
    pub fn has_divergent_passwords(&self) -> bool {
        let mut hashes = self.password_by_host.values();
        match hashes.next() {
            Some(first) => hashes.any(|h| h != first),
            None => false,
        }
    }

    /// Grants targeting `database`, in export order
    pub fn grants_on<'a>(&'a self, database: &'a str) -> impl Iterator<Item = &'a GrantLine> + 'a {
        self.grants
            .iter()
            .filter(move |g| g.database.as_deref() == Some(database))
    }
}

/// Kind of statement recognised on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
    CreateUser,
    Grant,
}

fn statement_kind(trimmed: &str) -> Option<Statement> {
    let bytes = trimmed.as_bytes();
    let starts_with = |prefix: &str| {
        bytes.len() >= prefix.len()
            && bytes[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    };
    if starts_with("CREATE USER ") {
        Some(Statement::CreateUser)
    } else if starts_with("GRANT ") {
        Some(Statement::Grant)
    } else {
        None
    }
}

/// Parse an account export into records keyed by account name
pub fn parse_accounts(export: &str, reporter: &dyn Reporter) -> BTreeMap<String, UserRecord> {
    let mut users: BTreeMap<String, UserRecord> = BTreeMap::new();

    for line in export.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(kind) = statement_kind(trimmed) else {
            continue;
        };
        let Some((name, host)) = find_user_host(trimmed) else {
            continue;
        };

        let user = users
            .entry(name.clone())
            .or_insert_with(|| UserRecord::new(name.as_str()));
        user.add_host(&host);

        if let Some(clause) = find_credential(trimmed, 0) {
            if !user.set_password(&host, &clause.hash) {
                reporter.warn(&format!(
                    "Account '{}'@'{}' has differing credential hashes; keeping the first",
                    name, host
                ));
            }
        }

        if kind == Statement::Grant {
            let database = find_grant_database(trimmed);
            if let Some(db) = &database {
                user.databases.insert(db.clone());
            }
            user.grants.push(GrantLine {
                raw: line.to_string(),
                database,
            });
        }
    }

    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;

    #[test]
    fn test_empty_export() {
        let reporter = MemoryReporter::new();
        assert!(parse_accounts("", &reporter).is_empty());
        assert!(parse_accounts("\n\n   \n", &reporter).is_empty());
    }

    #[test]
    fn test_create_and_grant_aggregate_per_name() {
        let reporter = MemoryReporter::new();
        let export = "CREATE USER 'app'@'%' IDENTIFIED BY PASSWORD '*A1';\n\
                      CREATE USER 'app'@'localhost' IDENTIFIED BY PASSWORD '*A1';\n\
                      GRANT SELECT ON `shop`.* TO 'app'@'%';\n\
                      GRANT USAGE ON *.* TO 'app'@'localhost';\n";
        let users = parse_accounts(export, &reporter);
        let app = &users["app"];

        assert_eq!(app.hosts, vec!["%".to_string(), "localhost".to_string()]);
        assert_eq!(app.chosen_password(), Some("*A1"));
        assert_eq!(app.grants.len(), 2);
        assert_eq!(app.databases.iter().collect::<Vec<_>>(), vec!["shop"]);
        assert_eq!(app.grants[1].database, None);
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn test_conflicting_hash_keeps_first_and_warns() {
        let reporter = MemoryReporter::new();
        let export = "CREATE USER 'app'@'%' IDENTIFIED BY PASSWORD '*FIRST';\n\
                      GRANT ALL ON `db`.* TO 'app'@'%' IDENTIFIED BY PASSWORD '*SECOND';\n";
        let users = parse_accounts(export, &reporter);

        assert_eq!(users["app"].password_by_host["%"], "*FIRST");
        assert_eq!(users["app"].chosen_password(), Some("*FIRST"));
        let warnings = reporter.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'app'@'%'"));
    }

    #[test]
    fn test_divergent_passwords_across_hosts() {
        let reporter = MemoryReporter::new();
        let export = "CREATE USER 'app'@'a' IDENTIFIED BY PASSWORD '*ONE';\n\
                      CREATE USER 'app'@'b' IDENTIFIED BY PASSWORD '*TWO';\n";
        let users = parse_accounts(export, &reporter);
        assert!(users["app"].has_divergent_passwords());
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn test_unrecognised_and_unresolvable_lines_are_skipped() {
        let reporter = MemoryReporter::new();
        let export = "-- comment\nSET NAMES utf8;\n\
                      GRANT ALL ON db.* TO ;\ncreate user bob@localhost;\n";
        let users = parse_accounts(export, &reporter);
        assert_eq!(users.len(), 1);
        assert_eq!(users["bob"].hosts, vec!["localhost".to_string()]);
        assert!(users["bob"].databases.is_empty());
    }
}
