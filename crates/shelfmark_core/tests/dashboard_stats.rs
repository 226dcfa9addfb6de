use rusqlite::Connection;
use shelfmark_core::db::open_db_in_memory;
use shelfmark_core::{
    dashboard_snapshot, Book, BookRepository, LoanService, Role, SqliteBookRepository,
    SqliteLoanRepository, SqliteUserRepository, User, UserRepository,
};

fn create_member(conn: &Connection, email: &str) -> User {
    let user = User::new(email, "Member", Role::Member);
    SqliteUserRepository::new(conn).create_user(&user).unwrap();
    user
}

fn create_book(conn: &mut Connection, title: &str, category: Option<&str>, copies: i64) -> Book {
    let mut book = Book::new(title, "Author").with_copies(copies);
    book.category = category.map(str::to_string);
    SqliteBookRepository::new(conn).create_book(&book).unwrap();
    book
}

#[test]
fn empty_catalog_yields_zeroed_snapshot() {
    let conn = open_db_in_memory().unwrap();

    let snapshot = dashboard_snapshot(&conn).unwrap();
    assert_eq!(snapshot.counters.total_books, 0);
    assert_eq!(snapshot.counters.available_copies, 0);
    assert_eq!(snapshot.counters.total_users, 0);
    assert_eq!(snapshot.counters.open_loans, 0);
    assert_eq!(snapshot.counters.overdue_loans, 0);
    assert!(snapshot.popular_books.is_empty());
    assert!(snapshot.books_by_category.is_empty());
}

#[test]
fn counters_track_loans_including_overdue_ones() {
    let mut conn = open_db_in_memory().unwrap();
    let u = create_member(&conn, "u@example.com");
    let v = create_member(&conn, "v@example.com");
    let first = create_book(&mut conn, "First", Some("Fiction"), 2);
    let second = create_book(&mut conn, "Second", Some("Fiction"), 1);

    let (late_loan, _) = {
        let mut loans = LoanService::new(SqliteLoanRepository::new(&mut conn));
        (
            loans.borrow(u.uuid, first.uuid).unwrap(),
            loans.borrow(v.uuid, second.uuid).unwrap(),
        )
    };
    conn.execute(
        "UPDATE loans SET due_date = 1000 WHERE uuid = ?1;",
        [late_loan.uuid.to_string()],
    )
    .unwrap();
    {
        let loans = LoanService::new(SqliteLoanRepository::new(&mut conn));
        loans.reconcile_overdue().unwrap();
    }

    let snapshot = dashboard_snapshot(&conn).unwrap();
    assert_eq!(snapshot.counters.total_books, 2);
    // 3 owned copies, 2 out on loan.
    assert_eq!(snapshot.counters.available_copies, 1);
    assert_eq!(snapshot.counters.total_users, 2);
    assert_eq!(snapshot.counters.open_loans, 2);
    assert_eq!(snapshot.counters.overdue_loans, 1);
}

#[test]
fn popularity_ranks_by_historical_loan_count() {
    let mut conn = open_db_in_memory().unwrap();
    let u = create_member(&conn, "u@example.com");
    let v = create_member(&conn, "v@example.com");
    let quiet = create_book(&mut conn, "Quiet", None, 3);
    let busy = create_book(&mut conn, "Busy", None, 3);

    {
        let mut loans = LoanService::new(SqliteLoanRepository::new(&mut conn));
        let loan = loans.borrow(u.uuid, busy.uuid).unwrap();
        loans.return_loan(loan.uuid, u.uuid, Role::Member).unwrap();
        loans.borrow(v.uuid, busy.uuid).unwrap();
        loans.borrow(u.uuid, quiet.uuid).unwrap();
    }

    let snapshot = dashboard_snapshot(&conn).unwrap();
    assert_eq!(snapshot.popular_books.len(), 2);
    assert_eq!(snapshot.popular_books[0].book_uuid, busy.uuid);
    assert_eq!(snapshot.popular_books[0].loan_count, 2);
    assert_eq!(snapshot.popular_books[1].book_uuid, quiet.uuid);
    assert_eq!(snapshot.popular_books[1].loan_count, 1);
}

#[test]
fn category_breakdown_counts_descending() {
    let mut conn = open_db_in_memory().unwrap();
    create_book(&mut conn, "One", Some("Fiction"), 1);
    create_book(&mut conn, "Two", Some("Fiction"), 1);
    create_book(&mut conn, "Three", Some("Fantasy"), 1);
    create_book(&mut conn, "Four", None, 1);

    let snapshot = dashboard_snapshot(&conn).unwrap();
    let pairs: Vec<(&str, i64)> = snapshot
        .books_by_category
        .iter()
        .map(|entry| (entry.category.as_str(), entry.count))
        .collect();
    assert_eq!(pairs, vec![("Fiction", 2), ("Fantasy", 1)]);
}
