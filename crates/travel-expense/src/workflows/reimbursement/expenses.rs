//! Expense application assembly: validation and totals for line items.

use chrono::{DateTime, Utc};

use super::domain::{
    Amount, ApprovalTrail, ExpenseApplication, ExpenseApplicationId, ExpenseItem,
    ExpenseItemDraft, ExpenseItemId, ItemsState, UserId,
};
use super::error::ValidationError;

/// Sum of item amounts. Rejects empty submissions and negative amounts.
pub fn total_amount(items: &[ExpenseItemDraft]) -> Result<Amount, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::NoItems);
    }

    items
        .iter()
        .enumerate()
        .try_fold(0, |total: Amount, (index, item)| {
            if item.amount < 0 {
                return Err(ValidationError::NegativeAmount {
                    index,
                    amount: item.amount,
                });
            }
            total
                .checked_add(item.amount)
                .ok_or(ValidationError::AmountOutOfRange)
        })
}

/// Application row and item rows ready for the two-phase write. The
/// application starts in `draft` with its items marked as pending.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseBundle {
    pub application: ExpenseApplication,
    pub items: Vec<ExpenseItem>,
}

pub fn assemble(
    owner: &UserId,
    title: &str,
    items: Vec<ExpenseItemDraft>,
    now: DateTime<Utc>,
) -> Result<ExpenseBundle, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingField("title"));
    }
    let total_amount = total_amount(&items)?;
    let application_id = ExpenseApplicationId::generate();

    let application = ExpenseApplication {
        id: application_id,
        user_id: owner.clone(),
        title: title.to_string(),
        total_amount,
        approval: ApprovalTrail::draft(),
        items_state: ItemsState::PendingItems,
        created_at: now,
        updated_at: now,
    };

    let items = items
        .into_iter()
        .map(|draft| ExpenseItem {
            id: ExpenseItemId::generate(),
            expense_application_id: application_id,
            category: draft.category,
            date: draft.date,
            amount: draft.amount,
            description: draft.description,
            receipt_url: draft.receipt_url,
            ocr_data: draft.ocr_data,
            created_at: now,
        })
        .collect();

    Ok(ExpenseBundle { application, items })
}
