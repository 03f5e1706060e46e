//! End-to-end: the client data-access layer against a served router.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use raceticket_client::{
    ChargeForm, Charge, Fetch, HttpFetcher, Session, TicketVending, VendingError, api,
};
use raceticket_core::purchase::TICKET_PRICE;
use raceticket_core::repository::{Database, RaceWindow};
use raceticket_core::{RaceList, User};
use raceticket_testing::{InMemoryDatabase, test_clock};
use raceticket_web::{AppState, build_router};
use std::sync::Arc;

async fn serve() -> (InMemoryDatabase, Arc<HttpFetcher>) {
    let db = InMemoryDatabase::new();
    db.initialize().await.unwrap();

    let app = build_router(AppState::with_clock(db.clone(), test_clock()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (db, Arc::new(HttpFetcher::new(format!("http://{addr}"))))
}

#[tokio::test]
async fn test_login_charge_and_buy() {
    let (db, fetcher) = serve().await;

    let session = Session::new();
    let user = session.login(fetcher.as_ref()).await.unwrap();
    assert_eq!(session.user_id(), Some(user.id));

    let me = Fetch::<User, _>::authorized(fetcher.clone(), api::users_me(), session.clone()).await;
    me.settled().await;
    assert_eq!(me.data().await.map(|u| u.balance), Some(0));

    let races = Fetch::<RaceList, _>::new(fetcher.clone(), api::races(RaceWindow::default())).await;
    races.settled().await;
    let race = races.data().await.unwrap().races.remove(0);

    let vending = TicketVending::new(fetcher.clone(), session.clone(), race.id);
    assert_eq!(
        vending.buy(vec![1, 2, 3], &me).await,
        Err(VendingError::InsufficientBalance)
    );

    let form = ChargeForm {
        bank_code: "0001".to_string(),
        branch_code: "001".to_string(),
        account_no: "1234567".to_string(),
        amount: 1000,
    };
    let result = Charge::new(fetcher.clone(), session.clone())
        .submit(&form, &me)
        .await;
    assert!(result.error.is_none());
    me.settled().await;
    assert_eq!(me.data().await.map(|u| u.balance), Some(1000));

    let quote = vending.quote(me.data().await.as_ref()).unwrap();
    assert_eq!(quote.balance_after, 1000 - TICKET_PRICE);

    let ticket = vending.buy(vec![1, 2, 3], &me).await.unwrap();
    assert_eq!(ticket.race_id, race.id);
    me.settled().await;
    assert_eq!(me.data().await.map(|u| u.balance), Some(1000 - TICKET_PRICE));
    assert_eq!(db.user(user.id).unwrap().balance, 1000 - TICKET_PRICE);

    me.close();
    races.close();
}

#[tokio::test]
async fn test_logged_out_fetch_issues_nothing() {
    let (_db, fetcher) = serve().await;
    let session = Session::new();

    let me = Fetch::<User, _>::authorized(fetcher.clone(), api::users_me(), session.clone()).await;
    assert!(me.data().await.is_none());

    let vending = TicketVending::new(fetcher, session, raceticket_core::RaceId::new());
    assert_eq!(vending.quote(None), Err(VendingError::LoginRequired));
    me.close();
}
