use serde_json::{Map, Value};

use crate::normalize;
use crate::payees::PayeeRules;

/// Required column order for per-month transaction CSVs.
pub const TRANSACTION_FIELDS: &[&str] = &[
    "Unique Transaction ID",
    "Unique Account ID",
    "Account Name",
    "Date",
    "Description",
    "Payee Name",
    "Amount",
    "Currency",
    "Category",
    "Is Transfer",
    "Notes",
    "Transfer Id",
];

/// Required column order for accounts.csv.
pub const ACCOUNT_FIELDS: &[&str] = &[
    "Unique Account ID",
    "Account Name",
    "Account Number",
    "Currency",
    "Type",
    "Status",
    "Current Balance",
    "Created At",
    "Statement Balance",
    "Remaining Balance Due",
    "Payment Due Date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Chequing,
    Savings,
    CreditCard,
    LineOfCredit,
    Mortgage,
    Investment,
    Loan,
    Other,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chequing => "Chequing",
            Self::Savings => "Savings",
            Self::CreditCard => "Credit Card",
            Self::LineOfCredit => "Line of Credit",
            Self::Mortgage => "Mortgage",
            Self::Investment => "Investment",
            Self::Loan => "Loan",
            Self::Other => "Other",
        }
    }

    /// Loose parse: case-insensitive, separators ignored. Unknown types map to Other.
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "chequing" | "checking" => Self::Chequing,
            "savings" => Self::Savings,
            "creditcard" => Self::CreditCard,
            "lineofcredit" => Self::LineOfCredit,
            "mortgage" => Self::Mortgage,
            "investment" => Self::Investment,
            "loan" => Self::Loan,
            _ => Self::Other,
        }
    }

    /// Liability accounts carry their balance as a negative (amount owed).
    pub fn is_liability(&self) -> bool {
        matches!(
            self,
            Self::CreditCard | Self::LineOfCredit | Self::Mortgage | Self::Loan
        )
    }
}

/// An ordered key/value record, the unit the CSV writer consumes.
///
/// Insertion order is preserved so extra bank-specific columns appear in
/// encounter order after the required prefix.
#[derive(Debug, Clone, Default)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: String) {
        if let Some(entry) = self.fields.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.fields.push((key.to_string(), value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

/// One monetary event on one account.
///
/// Fields are fixed at ingestion; after persistence only `transfer_id` is ever
/// mutated, and only by the transfer reconciler.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub unique_transaction_id: String,
    pub unique_account_id: String,
    pub account_name: String,
    pub date: String,
    pub description: String,
    pub payee_name: String,
    pub amount: f64,
    pub currency: String,
    pub category: String,
    pub is_transfer: bool,
    pub notes: String,
    pub transfer_id: Option<String>,
    /// Bank-specific fields preserved for audit; flattened into extra CSV columns.
    pub extras: Map<String, Value>,
}

impl Transaction {
    /// Build from a raw adapter record. Canonical keys are pulled out and
    /// normalized; everything else is kept in `extras`. When the bank supplied
    /// no transaction ID, a deterministic content hash stands in.
    pub fn from_raw(raw: Map<String, Value>, unique_account_id: &str) -> Self {
        let mut raw = raw;
        let date = normalize::normalize_date(&take_string(&mut raw, "Date"));
        let description = normalize::clean_description(&take_string(&mut raw, "Description"));
        let amount = take_f64(&mut raw, "Amount");

        let mut unique_transaction_id = take_string(&mut raw, "Unique Transaction ID");
        if unique_transaction_id.is_empty() {
            unique_transaction_id = normalize::generate_transaction_id(
                &date,
                amount,
                &description,
                unique_account_id,
            );
        }

        // The adapter may also have put an account id in the bag; the explicit
        // argument wins.
        take_string(&mut raw, "Unique Account ID");

        Self {
            unique_transaction_id,
            unique_account_id: unique_account_id.to_string(),
            account_name: take_string(&mut raw, "Account Name"),
            date,
            description,
            payee_name: take_string(&mut raw, "Payee Name"),
            amount,
            currency: take_string(&mut raw, "Currency"),
            category: take_string(&mut raw, "Category"),
            is_transfer: take_bool(&mut raw, "Is Transfer"),
            notes: take_string(&mut raw, "Notes"),
            transfer_id: none_if_empty(take_string(&mut raw, "Transfer Id")),
            extras: raw,
        }
    }

    /// Resolve the payee through the rule engine when the adapter left it blank.
    pub fn resolve_payee(&mut self, rules: &PayeeRules) {
        if self.payee_name.is_empty() {
            self.payee_name = rules.normalize(&self.description);
        }
    }

    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.set("Unique Transaction ID", self.unique_transaction_id.clone());
        row.set("Unique Account ID", self.unique_account_id.clone());
        row.set("Account Name", self.account_name.clone());
        row.set("Date", self.date.clone());
        row.set("Description", self.description.clone());
        row.set("Payee Name", self.payee_name.clone());
        row.set("Amount", format_amount(self.amount));
        row.set("Currency", self.currency.clone());
        row.set("Category", self.category.clone());
        row.set("Is Transfer", self.is_transfer.to_string());
        row.set("Notes", self.notes.clone());
        row.set("Transfer Id", self.transfer_id.clone().unwrap_or_default());
        append_extras(&mut row, &self.extras);
        row
    }
}

/// One bank account or card. Created or updated once per collaborator run,
/// never deleted.
#[derive(Debug, Clone)]
pub struct Account {
    pub unique_account_id: String,
    pub account_name: String,
    pub account_number: String,
    pub currency: String,
    pub kind: AccountType,
    pub status: String,
    pub current_balance: f64,
    pub statement_balance: f64,
    pub remaining_balance_due: f64,
    pub payment_due_date: String,
    pub created_at: String,
    pub extras: Map<String, Value>,
}

impl Account {
    pub fn from_raw(raw: Map<String, Value>, unique_account_id: &str) -> Self {
        let mut raw = raw;
        take_string(&mut raw, "Unique Account ID");
        Self {
            unique_account_id: unique_account_id.to_string(),
            account_name: take_string(&mut raw, "Account Name"),
            account_number: take_string(&mut raw, "Account Number"),
            currency: take_string(&mut raw, "Currency"),
            kind: AccountType::parse(&take_string(&mut raw, "Type")),
            status: take_string(&mut raw, "Status"),
            current_balance: take_f64(&mut raw, "Current Balance"),
            statement_balance: take_f64(&mut raw, "Statement Balance"),
            remaining_balance_due: take_f64(&mut raw, "Remaining Balance Due"),
            payment_due_date: take_string(&mut raw, "Payment Due Date"),
            created_at: take_string(&mut raw, "Created At"),
            extras: raw,
        }
    }

    pub fn to_row(&self) -> Row {
        // Liability balances are persisted as the amount owed, i.e. <= 0.
        let balance = if self.kind.is_liability() && self.current_balance > 0.0 {
            -self.current_balance
        } else {
            self.current_balance
        };
        let mut row = Row::new();
        row.set("Unique Account ID", self.unique_account_id.clone());
        row.set("Account Name", self.account_name.clone());
        row.set("Account Number", self.account_number.clone());
        row.set("Currency", self.currency.clone());
        row.set("Type", self.kind.as_str().to_string());
        row.set("Status", self.status.clone());
        row.set("Current Balance", format_amount(balance));
        row.set("Created At", self.created_at.clone());
        row.set("Statement Balance", format_amount(self.statement_balance));
        row.set(
            "Remaining Balance Due",
            format_amount(self.remaining_balance_due),
        );
        row.set("Payment Due Date", self.payment_due_date.clone());
        append_extras(&mut row, &self.extras);
        row
    }
}

/// Whole amounts keep one decimal place so a zero balance reads "0.0", not "0".
pub fn format_amount(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn none_if_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn take_string(raw: &mut Map<String, Value>, key: &str) -> String {
    match raw.remove(key) {
        Some(v) => value_to_string(&v),
        None => String::new(),
    }
}

fn take_f64(raw: &mut Map<String, Value>, key: &str) -> f64 {
    match raw.remove(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn take_bool(raw: &mut Map<String, Value>, key: &str) -> bool {
    match raw.remove(key) {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Lists and objects that reach a scalar slot are kept as compact JSON.
        other => other.to_string(),
    }
}

/// Flatten the extras bag onto the row, dot-joining nested object keys.
/// Keys that collide with a required column are skipped; the typed field wins.
fn append_extras(row: &mut Row, extras: &Map<String, Value>) {
    fn walk(row: &mut Row, prefix: &str, value: &Value) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    walk(row, &key, v);
                }
            }
            scalar => {
                if !row.contains_key(prefix) {
                    row.set(prefix, value_to_string(scalar));
                }
            }
        }
    }
    for (k, v) in extras {
        walk(row, k, v);
    }
}
