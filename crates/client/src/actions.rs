//! Payload builders for Web API actions.
//!
//! Reference:
//! https://docs.microsoft.com/en-us/dynamics365/customer-engagement/web-api/actions
//!
//! Each function returns an [`Action`] to pass to
//! [`crate::Client::execute_action`].

use serde_json::{Value, json};

/// A Web API action: its name, POST payload, and optionally the row it is
/// bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
  pub name: String,
  pub data: Value,
  pub bound_to: Option<(String, String)>,
}

impl Action {
  pub fn unbound(name: impl Into<String>, data: Value) -> Self {
    Self {
      name: name.into(),
      data,
      bound_to: None,
    }
  }

  pub fn bound(name: impl Into<String>, data: Value, table: impl Into<String>, row_id: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      data,
      bound_to: Some((table.into(), row_id.into())),
    }
  }
}

// Activity party participation masks
const PARTY_SENDER: u8 = 1;
const PARTY_TO_RECIPIENT: u8 = 2;
const PARTY_CC_RECIPIENT: u8 = 3;
const PARTY_BCC_RECIPIENT: u8 = 4;

fn email_parties(contacts: &[&str], party_type: u8) -> Vec<Value> {
  contacts
    .iter()
    .map(|contact| {
      json!({
        "partyid_systemuser@odata.bind": format!("/contacts({contact})"),
        "participationtypemask": party_type,
      })
    })
    .collect()
}

/// Construct the `SendEmailFromTemplate` action.
///
/// https://docs.microsoft.com/en-us/dynamics365/customer-engagement/web-api/sendemailfromtemplate
///
/// * `template_id`: email template GUID to use.
/// * `context_table` / `context_row_id`: the row whose data can be used
///   dynamically in the body of the email template.
/// * `sender_id`: systemuser GUID that sends the email.
///   Must have send-as privilege.
/// * `to_recipient_ids` / `cc_recipient_ids` / `bcc_recipient_ids`:
///   contact GUIDs to add as recipients.
pub fn send_email_from_template(
  template_id: &str,
  context_table: &str,
  context_row_id: &str,
  sender_id: &str,
  to_recipient_ids: &[&str],
  cc_recipient_ids: &[&str],
  bcc_recipient_ids: &[&str],
) -> Action {
  let mut parties = email_parties(&[sender_id], PARTY_SENDER);
  parties.extend(email_parties(to_recipient_ids, PARTY_TO_RECIPIENT));
  if !cc_recipient_ids.is_empty() {
    parties.extend(email_parties(cc_recipient_ids, PARTY_CC_RECIPIENT));
  }
  if !bcc_recipient_ids.is_empty() {
    parties.extend(email_parties(bcc_recipient_ids, PARTY_BCC_RECIPIENT));
  }

  let data = json!({
    "TemplateId": template_id,
    "Regarding": {
      "contactid": context_row_id,
      "@odata.type": format!("Microsoft.Dynamics.CRM.{context_table}"),
    },
    "Target": {
      "email_activity_parties": parties,
      "@odata.type": "Microsoft.Dynamics.CRM.email",
    },
  });

  Action::unbound("SendEmailFromTemplate", data)
}

/// Construct the `ConvertQuoteToSalesOrder` action.
///
/// * `quote_id`: quote to convert to an order.
/// * `select`: attributes to retrieve from the new salesorder.
pub fn convert_quote_to_order(quote_id: &str, select: &[&str]) -> Action {
  let column_set = if select.is_empty() {
    json!({"AllColumns": true})
  } else {
    json!({"AllColumns": false, "Columns": select})
  };

  Action::unbound(
    "ConvertQuoteToSalesOrder",
    json!({"QuoteId": quote_id, "ColumnSet": column_set}),
  )
}

/// Construct the `WinQuote` action, changing the quote to the Won state.
pub fn win_quote(quote_id: &str) -> Action {
  Action::unbound(
    "WinQuote",
    json!({
      "QuoteClose": {
        "quoteid@odata.bind": format!("/quotes({quote_id})"),
        "@odata.type": "Microsoft.Dynamics.CRM.quoteclose",
      },
      "Status": -1,
    }),
  )
}

/// Construct the `CloseQuote` action, changing the quote to the Canceled
/// state.
pub fn close_quote(quote_id: &str) -> Action {
  Action::unbound(
    "CloseQuote",
    json!({
      "QuoteClose": {
        "quoteid@odata.bind": format!("/quotes({quote_id})"),
        "@odata.type": "Microsoft.Dynamics.CRM.quoteclose",
      },
      "Status": -1,
    }),
  )
}

/// Construct the `ReviseQuote` action, changing the quote to the Draft
/// state.
///
/// * `select`: attributes to retrieve in the revised quote.
pub fn revise_quote(quote_id: &str, select: &[&str]) -> Action {
  let mut data = json!({"QuoteId": quote_id});
  if !select.is_empty() {
    data["ColumnSet"] = json!(select);
  }
  Action::unbound("ReviseQuote", data)
}

/// Construct the `CancelSalesOrder` action.
pub fn cancel_order(order_id: &str) -> Action {
  Action::unbound(
    "CancelSalesOrder",
    json!({
      "OrderClose": {
        "salesorderid@odata.bind": format!("/salesorders({order_id})"),
        "@odata.type": "Microsoft.Dynamics.CRM.orderclose",
      },
      "Status": 4, // No Money
    }),
  )
}
