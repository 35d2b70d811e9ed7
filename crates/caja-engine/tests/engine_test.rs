//! Engine service integration tests against an in-memory database.

use chrono::{Duration, Utc};
use uuid::Uuid;

use caja_core::{
    Register, RegisterStatus, TenderInput, TenderLine, Transaction, TransactionKind,
    ValidationError,
};
use caja_db::{Database, DbConfig};
use caja_engine::{
    CloseDrawer, ClosureService, EngineError, LedgerService, NewPosting, OpenRegister,
    PostingService, RegisterService, ReopenRegister,
};

const STORE: &str = "store-1";

async fn database() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

fn open_request(initial_balance_cents: i64) -> OpenRegister {
    OpenRegister {
        store_id: STORE.to_string(),
        name: None,
        initial_balance_cents,
    }
}

fn posting(
    register_id: &str,
    kind: TransactionKind,
    amount_cents: i64,
    tenders: Vec<TenderInput>,
) -> NewPosting {
    NewPosting {
        register_id: register_id.to_string(),
        kind,
        amount_cents,
        currency: None,
        employee: "Ana Torres".to_string(),
        description: "Movimiento de caja".to_string(),
        tenders,
        voucher: None,
        client_name: None,
        client_document: None,
        client_document_type: None,
    }
}

fn cash() -> Vec<TenderInput> {
    vec![TenderInput::implicit("Efectivo")]
}

// =============================================================================
// Register lifecycle
// =============================================================================

#[tokio::test]
async fn open_register_then_lookup() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());

    let register = registers.open(open_request(10_000)).await.unwrap();
    assert_eq!(register.status, RegisterStatus::Open);
    assert_eq!(register.name, "Caja Principal");

    let active = registers.active(STORE).await.unwrap().unwrap();
    assert_eq!(active.id, register.id);

    let balance = registers.balance(STORE).await.unwrap();
    assert_eq!(balance.balance_cents, 10_000);
    assert_eq!(balance.total_income_cents, 0);
}

#[tokio::test]
async fn second_open_register_conflicts() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());

    registers.open(open_request(10_000)).await.unwrap();
    let err = registers.open(open_request(5000)).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict { .. }));
}

#[tokio::test]
async fn concurrent_opens_exactly_one_succeeds() {
    let db = database().await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let registers = RegisterService::new(db.clone());
        handles.push(tokio::spawn(async move {
            registers.open(open_request(10_000)).await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(EngineError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);
}

#[tokio::test]
async fn negative_initial_balance_is_rejected() {
    let db = database().await;
    let registers = RegisterService::new(db);
    let err = registers.open(open_request(-100)).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

// =============================================================================
// Postings
// =============================================================================

#[tokio::test]
async fn postings_accrue_into_the_derived_balance() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());

    let register = registers.open(open_request(10_000)).await.unwrap();
    postings
        .post(posting(&register.id, TransactionKind::Income, 5000, cash()))
        .await
        .unwrap();
    postings
        .post(posting(&register.id, TransactionKind::Expense, 2000, cash()))
        .await
        .unwrap();

    let balance = registers.balance(STORE).await.unwrap();
    assert_eq!(balance.balance_cents, 13_000);
    assert_eq!(balance.total_income_cents, 5000);
    assert_eq!(balance.total_expense_cents, 2000);
    assert_eq!(balance.expected_cash_cents, 13_000);
}

#[tokio::test]
async fn posting_amount_must_be_positive() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let register = registers.open(open_request(10_000)).await.unwrap();

    let err = postings
        .post(posting(&register.id, TransactionKind::Income, 0, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::MustBePositive { .. })
    ));
}

#[tokio::test]
async fn tender_split_must_sum_to_amount() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let register = registers.open(open_request(10_000)).await.unwrap();

    // 60.00 + 30.00 ≠ 100.00
    let split = vec![
        TenderInput::with_amount("Efectivo", 6000),
        TenderInput::with_amount("Yape", 3000),
    ];
    let err = postings
        .post(posting(&register.id, TransactionKind::Income, 10_000, split))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::TenderSumMismatch {
            expected_cents: 10_000,
            actual_cents: 9000,
        })
    ));
}

#[tokio::test]
async fn duplicate_tender_category_is_rejected() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let register = registers.open(open_request(10_000)).await.unwrap();

    let split = vec![
        TenderInput::with_amount("Visa", 6000),
        TenderInput::with_amount("Mastercard", 4000),
    ];
    let err = postings
        .post(posting(&register.id, TransactionKind::Income, 10_000, split))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::DuplicateTender { .. })
    ));
}

#[tokio::test]
async fn expense_may_not_overdraw_the_drawer() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let register = registers.open(open_request(1000)).await.unwrap();

    let err = postings
        .post(posting(&register.id, TransactionKind::Expense, 5000, cash()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::NegativeBalance { .. })
    ));
}

#[tokio::test]
async fn posting_to_a_closed_register_is_rejected() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let closures = ClosureService::new(db.clone());

    let register = registers.open(open_request(10_000)).await.unwrap();
    closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 10_000,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap();

    let err = postings
        .post(posting(&register.id, TransactionKind::Income, 1000, cash()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

// =============================================================================
// Closure reconciliation
// =============================================================================

#[tokio::test]
async fn balanced_drawer_has_zero_discrepancy() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let closures = ClosureService::new(db.clone());

    // opening 100.00, cash income 50.00, cash expense 20.00
    let register = registers.open(open_request(10_000)).await.unwrap();
    postings
        .post(posting(&register.id, TransactionKind::Income, 5000, cash()))
        .await
        .unwrap();
    postings
        .post(posting(&register.id, TransactionKind::Expense, 2000, cash()))
        .await
        .unwrap();

    let closure = closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 13_000,
            employee: "Ana Torres".to_string(),
            notes: "Cierre del turno".to_string(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap();

    assert_eq!(closure.expected_cash_cents, 13_000);
    assert_eq!(closure.discrepancy_cents, 0);
    assert!(closure.is_balanced());
    assert_eq!(closure.opening_balance_cents, 10_000);
    assert_eq!(closure.closing_balance_cents, 13_000);
    assert_eq!(closure.total_income_cents, 5000);
    assert_eq!(closure.total_expense_cents, 2000);
    // Carry-forward defaults to the counted cash
    assert_eq!(closure.next_opening_balance_cents, 13_000);

    let stored = db.registers().get_by_id(&register.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RegisterStatus::Closed);
}

#[tokio::test]
async fn non_cash_income_is_excluded_from_expected_cash() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let closures = ClosureService::new(db.clone());

    let register = registers.open(open_request(10_000)).await.unwrap();
    postings
        .post(posting(&register.id, TransactionKind::Income, 5000, cash()))
        .await
        .unwrap();
    postings
        .post(posting(
            &register.id,
            TransactionKind::Income,
            8000,
            vec![TenderInput::implicit("Yape")],
        ))
        .await
        .unwrap();

    let closure = closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 14_000,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap();

    // Expected cash ignores the Yape income; counted 140.00 vs 150.00
    assert_eq!(closure.expected_cash_cents, 15_000);
    assert_eq!(closure.discrepancy_cents, -1000);
    // Totals still include every tender
    assert_eq!(closure.total_income_cents, 13_000);
}

#[tokio::test]
async fn counted_cash_must_be_non_negative() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let closures = ClosureService::new(db.clone());
    registers.open(open_request(10_000)).await.unwrap();

    let err = closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: -1,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::MustNotBeNegative { .. })
    ));
}

#[tokio::test]
async fn closing_without_an_open_register_is_not_found() {
    let db = database().await;
    let closures = ClosureService::new(db);

    let err = closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 0,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn second_closure_same_day_conflicts() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let closures = ClosureService::new(db.clone());

    registers.open(open_request(10_000)).await.unwrap();
    closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 10_000,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap();

    // A fresh session can open, but a second same-day closure is barred
    registers.open(open_request(10_000)).await.unwrap();
    let err = closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 10_000,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict { .. }));
}

#[tokio::test]
async fn reopen_seeds_the_carry_forward_balance() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let closures = ClosureService::new(db.clone());

    registers.open(open_request(10_000)).await.unwrap();
    closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 12_500,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            // Operator keeps 80.00 in the drawer for the next shift
            next_opening_balance_cents: Some(8000),
        })
        .await
        .unwrap();

    let next = closures
        .reopen_from_closure(ReopenRegister {
            store_id: STORE.to_string(),
            name: Some("Caja Principal - Turno 2".to_string()),
            initial_balance_cents: None,
        })
        .await
        .unwrap();
    assert_eq!(next.initial_balance_cents, 8000);
    assert!(next.is_open());

    let balance = registers.balance(STORE).await.unwrap();
    assert_eq!(balance.balance_cents, 8000);
}

#[tokio::test]
async fn reopen_without_any_closure_is_not_found() {
    let db = database().await;
    let closures = ClosureService::new(db);

    let err = closures
        .reopen_from_closure(ReopenRegister {
            store_id: STORE.to_string(),
            name: None,
            initial_balance_cents: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

// =============================================================================
// Ledger queries
// =============================================================================

#[tokio::test]
async fn day_ledger_merges_and_projects_the_closure() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let closures = ClosureService::new(db.clone());
    let ledger = LedgerService::new(db.clone());

    let register = registers.open(open_request(10_000)).await.unwrap();
    postings
        .post(posting(&register.id, TransactionKind::Income, 5000, cash()))
        .await
        .unwrap();
    postings
        .post(posting(&register.id, TransactionKind::Expense, 2000, cash()))
        .await
        .unwrap();
    closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 13_000,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap();

    let entries = ledger
        .day_ledger(STORE, Utc::now().date_naive())
        .await
        .unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].kind, TransactionKind::Income);
    assert_eq!(entries[1].kind, TransactionKind::Expense);
    assert_eq!(entries[2].kind, TransactionKind::Closure);
    assert_eq!(entries[2].amount_cents, 13_000);
    assert_eq!(entries[2].description, "Cierre de caja");
    // Ascending by timestamp
    assert!(entries.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn day_ledger_collapses_refetched_sale_records() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let ledger = LedgerService::new(db.clone());

    let register = registers.open(open_request(0)).await.unwrap();

    // Two raw rows for the same logical sale, as produced by overlapping
    // date-window fetches upstream of persistence.
    let sale_time = Utc::now();
    let description =
        "Venta registrada: Coca Cola 500ml - Cantidad: 2, Precio Unitario: 3.50";
    for _ in 0..2 {
        let tx = Transaction {
            id: Uuid::new_v4().to_string(),
            register_id: register.id.clone(),
            kind: TransactionKind::Income,
            amount_cents: 700,
            currency: "S/.".to_string(),
            employee: "Ana Torres".to_string(),
            description: description.to_string(),
            tenders: vec![TenderLine::new("Efectivo")],
            voucher: Some("B001-55".to_string()),
            client_name: None,
            client_document: None,
            client_document_type: None,
            created_at: sale_time,
        };
        db.transactions().insert(&tx).await.unwrap();
    }

    let entries = ledger
        .day_ledger(STORE, sale_time.date_naive())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    // Summed once: 2 × 3.50
    assert_eq!(entries[0].amount_cents, 700);
    assert_eq!(entries[0].voucher.as_deref(), Some("B001-55"));
}

#[tokio::test]
async fn transactions_since_is_strict_and_merged() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let ledger = LedgerService::new(db.clone());

    let register = registers.open(open_request(10_000)).await.unwrap();
    let before = Utc::now() - Duration::seconds(1);
    postings
        .post(posting(&register.id, TransactionKind::Income, 5000, cash()))
        .await
        .unwrap();

    let since = ledger
        .transactions_since(&register.id, before)
        .await
        .unwrap();
    assert_eq!(since.len(), 1);

    let nothing = ledger
        .transactions_since(&register.id, Utc::now() + Duration::seconds(5))
        .await
        .unwrap();
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn session_summary_carries_the_breakdown() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let ledger = LedgerService::new(db.clone());

    let register = registers.open(open_request(10_000)).await.unwrap();
    postings
        .post(posting(
            &register.id,
            TransactionKind::Income,
            10_000,
            vec![
                TenderInput::with_amount("Efectivo", 6000),
                TenderInput::with_amount("Yape", 4000),
            ],
        ))
        .await
        .unwrap();

    let summary = ledger.session_summary(STORE).await.unwrap();
    assert_eq!(summary.balance_cents, 20_000);
    assert_eq!(summary.expected_cash_cents, 16_000);
    assert_eq!(
        summary.breakdown.total_for("EFECTIVO").cents(),
        6000
    );
    assert_eq!(summary.breakdown.total_for("YAPE").cents(), 4000);
}

#[tokio::test]
async fn closure_history_pairs_each_shift_with_its_operations() {
    let db = database().await;
    let ledger = LedgerService::new(db.clone());

    // Yesterday's shift, written through the repositories so the
    // timestamps can sit in the past.
    let yesterday = Utc::now() - Duration::days(1);
    let old_register = Register {
        id: Uuid::new_v4().to_string(),
        store_id: STORE.to_string(),
        name: "Caja Principal".to_string(),
        initial_balance_cents: 10_000,
        status: RegisterStatus::Open,
        created_at: yesterday - Duration::hours(8),
    };
    db.registers().insert(&old_register).await.unwrap();
    let old_sale = Transaction {
        id: Uuid::new_v4().to_string(),
        register_id: old_register.id.clone(),
        kind: TransactionKind::Income,
        amount_cents: 4000,
        currency: "S/.".to_string(),
        employee: "Ana Torres".to_string(),
        description: "Venta mostrador".to_string(),
        tenders: vec![TenderLine::new("Efectivo")],
        voucher: None,
        client_name: None,
        client_document: None,
        client_document_type: None,
        created_at: yesterday - Duration::hours(2),
    };
    db.transactions().insert(&old_sale).await.unwrap();
    let old_closure = caja_core::Closure {
        id: Uuid::new_v4().to_string(),
        register_id: old_register.id.clone(),
        employee: "Ana Torres".to_string(),
        opening_balance_cents: 10_000,
        closing_balance_cents: 14_000,
        expected_cash_cents: 14_000,
        discrepancy_cents: 0,
        total_income_cents: 4000,
        total_expense_cents: 0,
        next_opening_balance_cents: 14_000,
        notes: String::new(),
        created_at: yesterday,
    };
    // insert_and_close flips the old register to closed, freeing the
    // store for today's session
    db.closures().insert_and_close(&old_closure).await.unwrap();

    // Today's shift through the services.
    let registers = RegisterService::new(db.clone());
    let postings = PostingService::new(db.clone());
    let closures = ClosureService::new(db.clone());
    let register = registers.open(open_request(14_000)).await.unwrap();
    postings
        .post(posting(&register.id, TransactionKind::Income, 2000, cash()))
        .await
        .unwrap();
    closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 16_000,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap();

    let history = ledger.closure_history(STORE).await.unwrap();
    assert_eq!(history.len(), 2);

    // Newest first: today's closure with today's operation only
    assert_eq!(history[0].closure.register_id, register.id);
    assert_eq!(history[0].operations.len(), 1);
    assert_eq!(history[0].operations[0].amount_cents, 2000);
    assert_eq!(
        history[0].breakdown.total_for("EFECTIVO").cents(),
        2000
    );

    // Yesterday's closure with yesterday's sale
    assert_eq!(history[1].closure.register_id, old_register.id);
    assert_eq!(history[1].operations.len(), 1);
    assert_eq!(history[1].operations[0].amount_cents, 4000);
}

#[tokio::test]
async fn closure_for_date_finds_the_daily_record() {
    let db = database().await;
    let registers = RegisterService::new(db.clone());
    let closures = ClosureService::new(db.clone());
    let ledger = LedgerService::new(db.clone());

    registers.open(open_request(10_000)).await.unwrap();
    let closure = closures
        .close_drawer(CloseDrawer {
            store_id: STORE.to_string(),
            counted_cash_cents: 10_000,
            employee: "Ana Torres".to_string(),
            notes: String::new(),
            next_opening_balance_cents: None,
        })
        .await
        .unwrap();

    let today = ledger
        .closure_for_date(STORE, Utc::now().date_naive())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(today.id, closure.id);

    let yesterday = ledger
        .closure_for_date(STORE, (Utc::now() - Duration::days(1)).date_naive())
        .await
        .unwrap();
    assert!(yesterday.is_none());
}
