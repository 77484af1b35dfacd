use super::*;
use crate::connector::{
    Connector, ConnectorError, ConnectorResult, MemoryConnector, MemoryJournal, QueryOutcome,
    Reply, share,
};
use crate::value::Value;
use std::sync::mpsc;
use std::thread;

fn shop_mappings() -> Mappings {
    Mappings::new()
        .with_database("shop", "primary")
        .with_database("catalog", "primary")
        .with_database("legacy", "oracle")
        .with_database("nowhere", "ghost")
        .with_dsn("primary", "memory://local/shop")
        .with_dsn("secondary", "memory://local/shop/")
        .with_dsn("oracle", "oracle://db.internal/legacy")
}

fn resolver_with(journal: &MemoryJournal) -> ResourceResolver {
    let mut registry = ConnectorRegistry::new();
    let shared = journal.clone();
    registry.register("memory", move || {
        share(MemoryConnector::with_journal(shared.clone()))
    });
    ResourceResolver::new(MappingSource::inline(shop_mappings())).with_registry(registry)
}

fn products() -> RecordProxy {
    RecordProxy::new("catalog", "products").with_operation("instock", |record, _| {
        record.builder_mut()?.where_raw("stock > 0")?;
        Ok(Reply::Ack(true))
    })
}

fn misregistered() -> RecordProxy {
    RecordProxy::new("catalog", "something_else")
}

crate::register_record!("catalog.products", products);
crate::register_record!("catalog.broken", misregistered);

#[test]
fn test_same_string_same_connector() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    let a = resolver.resolve_connector("memory://local/shop").unwrap();
    let b = resolver.resolve_connector("memory://local/shop").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(journal.connect_calls(), 1);
    assert_eq!(resolver.cached_connectors(), 1);
}

#[test]
fn test_cache_is_keyed_literally() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    let a = resolver.resolve_connector("memory://local/shop").unwrap();
    let b = resolver.resolve_connector("memory://local/shop/").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(journal.connect_calls(), 2);
}

#[test]
fn test_concurrent_first_resolution_connects_once() {
    let journal = MemoryJournal::new();
    let resolver = Arc::new(resolver_with(&journal));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || resolver.resolve_connector("memory://local/shop").unwrap())
        })
        .collect();
    let connectors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(journal.connect_calls(), 1);
    assert!(connectors.iter().all(|c| Arc::ptr_eq(c, &connectors[0])));
}

/// Connector whose `connect` blocks until released.
struct GatedConnector {
    entered: mpsc::Sender<()>,
    release: Arc<Mutex<mpsc::Receiver<()>>>,
}

impl Connector for GatedConnector {
    fn scheme(&self) -> &str {
        "gated"
    }

    fn connect(&mut self, _descriptor: &ConnectionDescriptor) -> ConnectorResult<()> {
        let _ = self.entered.send(());
        let _ = self.release.lock().unwrap().recv();
        Ok(())
    }

    fn disconnect(&mut self) -> ConnectorResult<()> {
        Ok(())
    }

    fn select_database(&mut self, _name: &str) -> ConnectorResult<()> {
        Ok(())
    }

    fn execute_query(&mut self, _sql: &str) -> ConnectorResult<QueryOutcome> {
        Ok(QueryOutcome::default())
    }

    fn last_error(&self) -> Option<&ConnectorError> {
        None
    }
}

#[test]
fn test_slow_connect_leaves_other_strings_available() {
    let journal = MemoryJournal::new();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let release = Arc::new(Mutex::new(release_rx));

    let mut resolver = resolver_with(&journal);
    resolver.registry_mut().register("gated", move || {
        share(GatedConnector {
            entered: entered_tx.clone(),
            release: Arc::clone(&release),
        })
    });
    let resolver = Arc::new(resolver);

    let slow = {
        let resolver = Arc::clone(&resolver);
        thread::spawn(move || resolver.resolve_connector("gated://db/slow").is_ok())
    };
    entered_rx.recv().unwrap();

    // gated connect still in progress
    let a = resolver.resolve_connector("memory://local/shop").unwrap();
    let b = resolver.resolve_connector("memory://local/shop").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(journal.connect_calls(), 1);

    release_tx.send(()).unwrap();
    assert!(slow.join().unwrap());
    assert_eq!(resolver.cached_connectors(), 2);
}

#[test]
fn test_connect_resolves_resource() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    let connector = resolver.connect(" Shop.Users ").unwrap();
    let record = resolver.create_record("catalog.items", "select").unwrap();
    assert!(Arc::ptr_eq(&connector, record.connector().unwrap()));
    assert_eq!(journal.connection_strings(), vec!["memory://local/shop"]);
    // selecting a database is left to create_record
    assert_eq!(journal.selected_databases(), vec!["catalog"]);

    assert!(matches!(resolver.connect(""), Err(DaoError::EmptyInput(_))));
    assert!(matches!(resolver.connect("shop"), Err(DaoError::MalformedResource(_))));
    assert!(matches!(
        resolver.connect("billing.invoices"),
        Err(DaoError::NoMappingFound { .. })
    ));
    assert!(matches!(
        resolver.connect("legacy.accounts"),
        Err(DaoError::ConnectorNotFound(_))
    ));
    assert_eq!(resolver.cached_connectors(), 1);
}

#[test]
fn test_resolve_connector_failures() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    assert!(matches!(
        resolver.resolve_connector(""),
        Err(DaoError::EmptyInput(_))
    ));
    assert!(matches!(
        resolver.resolve_connector("local/shop"),
        Err(DaoError::UnknownScheme(_))
    ));
    assert!(matches!(
        resolver.resolve_connector("oracle://db.internal/legacy"),
        Err(DaoError::ConnectorNotFound(ref s)) if s == "oracle"
    ));
    assert_eq!(journal.connect_calls(), 0);
}

#[test]
fn test_connect_failure_is_not_cached() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);
    journal.fail_connect(ConnectorError::new("AUTH", "password rejected"));

    let Err(err) = resolver.resolve_connector("memory://u:pw@local/shop") else {
        panic!("connect should have failed");
    };
    assert!(matches!(err, DaoError::ConnectFailed(ref d) if d.code == "AUTH"));
    assert!(err.is_resolution_failure());
    assert_eq!(resolver.cached_connectors(), 0);
}

#[test]
fn test_create_record_normalizes_resource() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    let record = resolver.create_record("  Shop.Users ", "SELECT").unwrap();
    assert_eq!(record.database(), "shop");
    assert_eq!(record.table(), "users");
    assert_eq!(
        record.builder().unwrap().build().unwrap(),
        "SELECT * FROM users"
    );
    assert_eq!(journal.selected_databases(), vec!["shop"]);
}

#[test]
fn test_create_record_each_kind() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    for kind in ["select", "update", "insert", "delete"] {
        let record = resolver.create_record("shop.users", kind).unwrap();
        let builder = record.builder().unwrap();
        assert_eq!(builder.kind().map(|k| k.as_str().to_ascii_lowercase()), Some(kind.to_string()));
        assert_eq!(builder.table(), Some("users"));
    }

    let info = resolver.create_record("shop.users", "info").unwrap();
    assert!(info.builder().is_none());
    assert!(info.connector().is_some());

    // one connector for all of them
    assert_eq!(journal.connect_calls(), 1);
}

#[test]
fn test_invalid_input_never_connects() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    assert!(matches!(
        resolver.create_record("  ", "select"),
        Err(DaoError::EmptyInput(_))
    ));
    assert!(matches!(
        resolver.create_record("Foo.Bar", "bogus_type"),
        Err(DaoError::InvalidQueryType(ref m)) if m.contains("bogus_type") && m.contains("info")
    ));
    assert!(matches!(
        resolver.create_record("shopusers", "select"),
        Err(DaoError::MalformedResource(_))
    ));
    assert!(matches!(
        resolver.create_record(".users", "select"),
        Err(DaoError::MalformedResource(_))
    ));
    assert_eq!(journal.connect_calls(), 0);
}

#[test]
fn test_unmapped_resources() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    let err = resolver.create_record("billing.invoices", "select").unwrap_err();
    assert!(matches!(
        err,
        DaoError::NoMappingFound { table: crate::error::MappingTable::Databases, ref key } if key == "billing"
    ));

    let err = resolver.create_record("nowhere.things", "select").unwrap_err();
    assert!(matches!(
        err,
        DaoError::NoMappingFound { table: crate::error::MappingTable::Dsn, ref key } if key == "ghost"
    ));

    assert!(matches!(
        resolver.create_record("legacy.accounts", "select"),
        Err(DaoError::ConnectorNotFound(_))
    ));
    assert_eq!(journal.connect_calls(), 0);
}

#[test]
fn test_database_select_failure() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);
    journal.reject_database("shop");

    let err = resolver.create_record("shop.users", "select").unwrap_err();
    assert!(matches!(
        err,
        DaoError::DatabaseSelectFailed { ref database, ref source } if database == "shop" && source.code == "UNKNOWN_DATABASE"
    ));
}

#[test]
fn test_builder_uses_connector_escaper() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    let mut record = resolver.create_record("shop.users", "select").unwrap();
    record.call("byName", &[Value::text("O'Brien")]).unwrap();
    record.execute().unwrap();
    assert_eq!(
        journal.last_statement().as_deref(),
        Some("SELECT * FROM users WHERE name = 'O''Brien'")
    );
}

#[test]
fn test_registered_record_is_used() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    let mut record = resolver.create_record("Catalog.Products", "select").unwrap();
    record.call("inStock", &[]).unwrap();
    record.execute().unwrap();
    assert_eq!(
        journal.last_statement().as_deref(),
        Some("SELECT * FROM products WHERE stock > 0")
    );
    assert_eq!(journal.selected_databases(), vec!["catalog"]);
}

#[test]
fn test_misregistered_record_is_rejected() {
    let journal = MemoryJournal::new();
    let resolver = resolver_with(&journal);

    assert!(matches!(
        resolver.create_record("catalog.broken", "select"),
        Err(DaoError::InvalidResourceType(_))
    ));
    assert_eq!(journal.connect_calls(), 0);
}

struct Stub {
    connector: SharedConnector,
}

impl ResolutionStrategy for Stub {
    fn resolve_connector(&self, _connection_string: &str) -> DaoResult<SharedConnector> {
        Ok(Arc::clone(&self.connector))
    }

    fn alias_for(&self, _database: &str) -> DaoResult<String> {
        Ok("stub".to_string())
    }

    fn connection_string_for(&self, _alias: &str) -> DaoResult<String> {
        Ok("stub://anywhere".to_string())
    }
}

#[test]
fn test_strategy_takes_precedence() {
    let journal = MemoryJournal::new();
    let stub_journal = MemoryJournal::new();
    let connector = share(MemoryConnector::with_journal(stub_journal.clone()));
    {
        let descriptor = ConnectionDescriptor::parse("memory://stub/any").unwrap();
        lock(&connector).connect(&descriptor).unwrap();
    }

    let resolver = resolver_with(&journal).with_strategy(Arc::new(Stub {
        connector: Arc::clone(&connector),
    }));

    // unmapped in the real tables, answered by the stub
    let mut record = resolver.create_record("billing.invoices", "delete").unwrap();
    assert_eq!(resolver.dsn_for_database("billing").unwrap(), "stub");
    assert!(Arc::ptr_eq(record.connector().unwrap(), &connector));

    record.call("byId", &[Value::Int(9)]).unwrap();
    record.execute().unwrap();

    assert_eq!(
        stub_journal.last_statement().as_deref(),
        Some("DELETE FROM invoices WHERE id = 9")
    );
    assert_eq!(journal.connect_calls(), 0);
    assert_eq!(resolver.cached_connectors(), 0);
}

#[test]
fn test_mapping_file_errors_surface() {
    let resolver = ResourceResolver::new(MappingSource::inline(Mappings::new()));
    assert!(resolver.dsn_for_database("shop").unwrap_err().is_no_mapping());

    let path = std::env::temp_dir().join(format!("rowgate-bad-{}.toml", std::process::id()));
    std::fs::write(&path, "[databases\n").unwrap();
    let resolver = ResourceResolver::new(MappingSource::file(&path));
    assert!(matches!(
        resolver.create_record("shop.users", "select"),
        Err(DaoError::InvalidMapping(_))
    ));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_redact_masks_password() {
    assert_eq!(
        redact("postgres://app:s3cret@db:5432/shop"),
        "postgres://app:***@db:5432/shop"
    );
    assert_eq!(redact("memory://local/shop"), "memory://local/shop");
}
