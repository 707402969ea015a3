mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use salesdesk_api::{
    errors::ServiceError,
    services::{
        pricing::{DiscountMode, LineInput, TaxMode},
        profit_sharing::ShareLeadCommand,
        quotes::CreateQuoteCommand,
    },
};

fn share_cmd(
    lead_id: uuid::Uuid,
    initiator: uuid::Uuid,
    collaborator: uuid::Uuid,
) -> ShareLeadCommand {
    ShareLeadCommand {
        lead_id,
        initiating_member_id: initiator,
        shared_member_id: collaborator,
        profit_percentage: Some(dec!(30)),
        profit_amount: None,
        quote_id: None,
    }
}

#[tokio::test]
async fn sharing_a_lead_records_one_ledger_row() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let partner = app.seed_member("Pat", "pat@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let row = app
        .state
        .profit_sharing
        .share(share_cmd(lead.id, owner.id, partner.id))
        .await
        .expect("share");

    assert_eq!(row.lead_id, lead.id);
    assert_eq!(row.shared_member_id, partner.id);
    assert_eq!(row.profit_percentage, Some(dec!(30.000)));
    assert_eq!(row.profit_amount, None);
}

#[tokio::test]
async fn sharing_the_same_pair_twice_conflicts() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let partner = app.seed_member("Pat", "pat@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    app.state
        .profit_sharing
        .share(share_cmd(lead.id, owner.id, partner.id))
        .await
        .expect("first share");

    let err = app
        .state
        .profit_sharing
        .share(share_cmd(lead.id, owner.id, partner.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let rows = app
        .state
        .profit_sharing
        .shares_for_lead(lead.id)
        .await
        .expect("list");
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn a_lead_cannot_be_shared_with_its_initiator() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let err = app
        .state
        .profit_sharing
        .share(share_cmd(lead.id, owner.id, owner.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn share_percentage_is_bounded() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let partner = app.seed_member("Pat", "pat@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let mut cmd = share_cmd(lead.id, owner.id, partner.id);
    cmd.profit_percentage = Some(dec!(150));

    let err = app.state.profit_sharing.share(cmd).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn unknown_collaborator_is_not_found() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    let err = app
        .state
        .profit_sharing
        .share(share_cmd(lead.id, owner.id, uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn creating_a_quote_settles_the_ledger_amounts() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let partner = app.seed_member("Pat", "pat@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    app.state
        .profit_sharing
        .share(share_cmd(lead.id, owner.id, partner.id))
        .await
        .expect("share");

    // qty 2 x cost 100 at 10% margin: gross profit 20. 30% of that is 6.
    let quote = app
        .state
        .quotes
        .create_quote(
            CreateQuoteCommand {
                lead_id: lead.id,
                lines: vec![LineInput {
                    product: "Widget".to_string(),
                    quantity: 2,
                    unit_cost: dec!(100),
                    margin_percent: dec!(10),
                    vat_percent: dec!(0),
                }],
                discount_mode: DiscountMode::Amount,
                discount_value: dec!(0),
                tax_mode: TaxMode::PerLine,
                header_vat_percent: dec!(0),
                valid_until: None,
                share_percent: None,
            },
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");

    let rows = app
        .state
        .profit_sharing
        .shares_for_lead(lead.id)
        .await
        .expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quote_id, Some(quote.id));
    assert_eq!(rows[0].profit_percentage, Some(dec!(30.000)));
    assert_eq!(rows[0].profit_amount, Some(dec!(6.00)));
}

#[tokio::test]
async fn an_explicit_share_percent_overrides_the_ledger() {
    let app = TestApp::new().await;
    let owner = app.seed_member("Sam", "sam@salesdesk.test", false).await;
    let partner = app.seed_member("Pat", "pat@salesdesk.test", false).await;
    let lead = app.seed_lead(&owner).await;

    app.state
        .profit_sharing
        .share(share_cmd(lead.id, owner.id, partner.id))
        .await
        .expect("share");

    app.state
        .quotes
        .create_quote(
            CreateQuoteCommand {
                lead_id: lead.id,
                lines: vec![LineInput {
                    product: "Widget".to_string(),
                    quantity: 2,
                    unit_cost: dec!(100),
                    margin_percent: dec!(10),
                    vat_percent: dec!(0),
                }],
                discount_mode: DiscountMode::Amount,
                discount_value: dec!(0),
                tax_mode: TaxMode::PerLine,
                header_vat_percent: dec!(0),
                valid_until: None,
                share_percent: Some(dec!(50)),
            },
            app.member_actor(&owner),
        )
        .await
        .expect("create quote");

    let rows = app
        .state
        .profit_sharing
        .shares_for_lead(lead.id)
        .await
        .expect("list");
    assert_eq!(rows[0].profit_percentage, Some(dec!(50.000)));
    assert_eq!(rows[0].profit_amount, Some(dec!(10.00)));
}

#[tokio::test]
async fn share_rows_keep_plain_lead_references() {
    use chrono::Utc;
    use salesdesk_api::entities::share_gp;
    use sea_orm::{ActiveModelTrait, Set};
    use uuid::Uuid;

    let app = TestApp::new().await;

    // The lead reference is intentionally unenforced at the schema level;
    // services resolve it with explicit lookups.
    let inserted = share_gp::ActiveModel {
        id: Set(Uuid::new_v4()),
        lead_id: Set(Uuid::new_v4()),
        quote_id: Set(None),
        initiating_member_id: Set(Uuid::new_v4()),
        shared_member_id: Set(Uuid::new_v4()),
        profit_percentage: Set(Some(dec!(30))),
        profit_amount: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(&*app.state.db)
    .await;
    assert!(inserted.is_ok());
}
