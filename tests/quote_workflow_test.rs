mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use salesdesk_api::{
    entities::quote::QuoteStatus,
    errors::ServiceError,
    services::{
        pricing::{DiscountMode, LineInput, TaxMode},
        quotes::{CreateQuoteCommand, UpdateQuoteLinesCommand},
    },
};

fn line(unit_cost: rust_decimal::Decimal, margin: rust_decimal::Decimal) -> LineInput {
    LineInput {
        product: "Widget".to_string(),
        quantity: 2,
        unit_cost,
        margin_percent: margin,
        vat_percent: dec!(5),
    }
}

fn cmd(lead_id: uuid::Uuid, lines: Vec<LineInput>) -> CreateQuoteCommand {
    CreateQuoteCommand {
        lead_id,
        lines,
        discount_mode: DiscountMode::Amount,
        discount_value: dec!(0),
        tax_mode: TaxMode::PerLine,
        header_vat_percent: dec!(0),
        valid_until: None,
        share_percent: None,
    }
}

#[tokio::test]
async fn healthy_margin_quote_starts_as_draft_with_computed_totals() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(10))]),
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");

    assert_eq!(quote.status, QuoteStatus::Draft.to_string());
    // qty 2 x cost 100 at 10% margin: price 110, gross 220, tax 5% = 11
    assert_eq!(quote.subtotal, dec!(220.00));
    assert_eq!(quote.total_cost, dec!(200.00));
    assert_eq!(quote.vat_amount, dec!(11.00));
    assert_eq!(quote.grand_total, dec!(231.00));
    assert_eq!(quote.gross_profit, dec!(20.00));

    let (_, lines) = app.state.quotes.get_quote(quote.id).await.expect("get");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].sl_no, 1);
    assert_eq!(lines[0].unit_price, dec!(110.00));
    assert_eq!(lines[0].line_gp, dec!(20.00));
}

#[tokio::test]
async fn percent_discount_reduces_grand_total_but_not_tax() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let mut create = cmd(lead.id, vec![line(dec!(100), dec!(10))]);
    create.discount_mode = DiscountMode::Percent;
    create.discount_value = dec!(10);

    let quote = app
        .state
        .quotes
        .create_quote(create, app.member_actor(&owner))
        .await
        .expect("create quote");

    // 220 gross, 10% discount = 22, tax stays on the undiscounted 220
    assert_eq!(quote.discount_amount, dec!(22.00));
    assert_eq!(quote.vat_amount, dec!(11.00));
    assert_eq!(quote.grand_total, dec!(209.00));
}

#[tokio::test]
async fn low_margin_quote_from_member_needs_approval() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(5))]),
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");

    assert_eq!(quote.status, QuoteStatus::PendingApproval.to_string());
}

#[tokio::test]
async fn low_margin_quote_from_admin_skips_the_gate() {
    let app = TestApp::new().await;
    let admin = app.seed_member("Alex", "alex@salesdesk.test", true).await;
    let lead = app.seed_lead(&admin).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(5))]),
            app.admin(&admin),
        )
        .await
        .expect("create quote");

    assert_eq!(quote.status, QuoteStatus::Draft.to_string());
}

#[tokio::test]
async fn admin_approval_returns_quote_to_draft() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let admin = app.seed_member("Alex", "alex@salesdesk.test", true).await;
    let lead = app.seed_lead(&owner).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(5))]),
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");

    let approved = app
        .state
        .quotes
        .approve_quote(quote.id, app.admin(&admin))
        .await
        .expect("approve");

    assert_eq!(approved.status, QuoteStatus::Draft.to_string());
    assert_eq!(approved.approved_by_id, Some(admin.id));
}

#[tokio::test]
async fn members_cannot_decide_approvals() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(5))]),
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");

    let err = app
        .state
        .quotes
        .approve_quote(quote.id, app.member_actor(&owner))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn rejection_requires_a_note_and_records_it() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let admin = app.seed_member("Alex", "alex@salesdesk.test", true).await;
    let lead = app.seed_lead(&owner).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(5))]),
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");

    let err = app
        .state
        .quotes
        .reject_quote(quote.id, "  ", app.admin(&admin))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let rejected = app
        .state
        .quotes
        .reject_quote(quote.id, "margin too thin for this customer", app.admin(&admin))
        .await
        .expect("reject");
    assert_eq!(rejected.status, QuoteStatus::Rejected.to_string());
    assert_eq!(
        rejected.rejection_note.as_deref(),
        Some("margin too thin for this customer")
    );
}

#[tokio::test]
async fn decisions_on_settled_quotes_conflict() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let admin = app.seed_member("Alex", "alex@salesdesk.test", true).await;
    let lead = app.seed_lead(&owner).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(5))]),
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");

    app.state
        .quotes
        .reject_quote(quote.id, "no", app.admin(&admin))
        .await
        .expect("reject");

    // A second decision on the now-terminal quote must conflict.
    let err = app
        .state
        .quotes
        .approve_quote(quote.id, app.admin(&admin))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn send_accept_and_expire_follow_the_lifecycle() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(10))]),
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");

    // Accept straight from draft is not allowed.
    let err = app.state.quotes.accept_quote(quote.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let sent = app.state.quotes.send_quote(quote.id).await.expect("send");
    assert_eq!(sent.status, QuoteStatus::Sent.to_string());

    let accepted = app
        .state
        .quotes
        .accept_quote(quote.id)
        .await
        .expect("accept");
    assert_eq!(accepted.status, QuoteStatus::Accepted.to_string());

    // Terminal now: expiry no longer applies.
    let err = app.state.quotes.expire_quote(quote.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn editing_lines_reprices_and_reruns_the_gate() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let admin = app.seed_member("Alex", "alex@salesdesk.test", true).await;
    let lead = app.seed_lead(&owner).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(5))]),
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");
    app.state
        .quotes
        .approve_quote(quote.id, app.admin(&admin))
        .await
        .expect("approve");

    // Dropping the margin again sends the quote back through the gate and
    // clears the earlier approval.
    let updated = app
        .state
        .quotes
        .update_quote_lines(
            quote.id,
            UpdateQuoteLinesCommand {
                lines: vec![line(dec!(100), dec!(2))],
                discount_mode: DiscountMode::Amount,
                discount_value: dec!(0),
                tax_mode: TaxMode::PerLine,
                header_vat_percent: dec!(0),
            },
            app.member_actor(&owner),
        )
        .await
        .expect("update");

    assert_eq!(updated.status, QuoteStatus::PendingApproval.to_string());
    assert_eq!(updated.approved_by_id, None);

    let (_, lines) = app.state.quotes.get_quote(quote.id).await.expect("get");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].margin_percent, dec!(2.000));
}

#[tokio::test]
async fn settled_quotes_cannot_be_edited() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let quote = app
        .state
        .quotes
        .create_quote(
            cmd(lead.id, vec![line(dec!(100), dec!(10))]),
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");
    app.state.quotes.send_quote(quote.id).await.expect("send");
    app.state
        .quotes
        .accept_quote(quote.id)
        .await
        .expect("accept");

    let err = app
        .state
        .quotes
        .update_quote_lines(
            quote.id,
            UpdateQuoteLinesCommand {
                lines: vec![line(dec!(100), dec!(10))],
                discount_mode: DiscountMode::Amount,
                discount_value: dec!(0),
                tax_mode: TaxMode::PerLine,
                header_vat_percent: dec!(0),
            },
            app.member_actor(&owner),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn unknown_lead_is_not_found() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;

    let err = app
        .state
        .quotes
        .create_quote(
            cmd(uuid::Uuid::new_v4(), vec![line(dec!(100), dec!(10))]),
            app.member_actor(&owner),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn quote_rows_keep_plain_lead_references() {
    use chrono::Utc;
    use salesdesk_api::entities::quote;
    use sea_orm::{ActiveModelTrait, Set};
    use uuid::Uuid;

    let app = TestApp::new().await;

    // The lead reference is intentionally unenforced at the schema level;
    // services resolve it with explicit lookups. A row pointing at a lead
    // the database has never seen must insert cleanly.
    let inserted = quote::ActiveModel {
        id: Set(Uuid::new_v4()),
        quote_number: Set("Q-99999".to_string()),
        lead_id: Set(Uuid::new_v4()),
        customer_name: Set("Imported Customer".to_string()),
        customer_email: Set(None),
        salesperson_id: Set(Uuid::new_v4()),
        salesperson_name: Set("Sam".to_string()),
        status: Set(QuoteStatus::Draft.to_string()),
        quote_date: Set(Utc::now()),
        valid_until: Set(None),
        subtotal: Set(dec!(0)),
        total_cost: Set(dec!(0)),
        discount_mode: Set("AMOUNT".to_string()),
        discount_value: Set(dec!(0)),
        discount_amount: Set(dec!(0)),
        tax_mode: Set("PER_LINE".to_string()),
        vat_percent: Set(dec!(0)),
        vat_amount: Set(dec!(0)),
        grand_total: Set(dec!(0)),
        gross_profit: Set(dec!(0)),
        profit_percent: Set(dec!(0)),
        created_by_type: Set("MEMBER".to_string()),
        created_by_id: Set(Uuid::new_v4()),
        approved_by_id: Set(None),
        rejection_note: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(&*app.state.db)
    .await;
    assert!(inserted.is_ok());
}
