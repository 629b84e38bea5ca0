//! Balance reconciliation.
//!
//! Pure arithmetic over wallet snapshots: nothing here touches storage. Every
//! rule is built from two primitives, [`apply_new`] and [`revert`], so an edit
//! is always "undo the old effect, then apply the new one" and the cached
//! totals stay in line with the transaction log.
//!
//! A wallet snapshot satisfies `amount == total_income - total_expenses` and
//! `amount >= 0`. Functions returning `Ok` preserve both (the second one is
//! checked, the first one follows from the formulas).

use serde::{Deserialize, Serialize};

use crate::{MoneyCents, TransactionKind};

/// Cached totals of a wallet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub amount: MoneyCents,
    pub total_income: MoneyCents,
    pub total_expenses: MoneyCents,
}

/// The signed contribution of one transaction to its wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxEffect {
    pub kind: TransactionKind,
    pub amount: MoneyCents,
}

/// Why a reconciliation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The wallet cannot cover the requested decrease.
    InsufficientBalance {
        available: MoneyCents,
        required: MoneyCents,
    },
    /// Reverting a transaction would leave the wallet below zero.
    WouldGoNegative { resulting: MoneyCents },
    Overflow,
}

pub type Reconciled<T> = Result<T, Rejection>;

fn add(a: MoneyCents, b: MoneyCents) -> Reconciled<MoneyCents> {
    a.checked_add(b).ok_or(Rejection::Overflow)
}

fn sub(a: MoneyCents, b: MoneyCents) -> Reconciled<MoneyCents> {
    a.checked_sub(b).ok_or(Rejection::Overflow)
}

impl WalletBalance {
    pub const EMPTY: WalletBalance = WalletBalance {
        amount: MoneyCents::ZERO,
        total_income: MoneyCents::ZERO,
        total_expenses: MoneyCents::ZERO,
    };

    #[must_use]
    pub fn new(amount: i64, total_income: i64, total_expenses: i64) -> Self {
        Self {
            amount: MoneyCents::new(amount),
            total_income: MoneyCents::new(total_income),
            total_expenses: MoneyCents::new(total_expenses),
        }
    }

    /// `true` when `amount == total_income - total_expenses`.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_income
            .checked_sub(self.total_expenses)
            .is_some_and(|net| net == self.amount)
    }

    fn credit_income(self, amount: MoneyCents) -> Reconciled<Self> {
        Ok(Self {
            amount: add(self.amount, amount)?,
            total_income: add(self.total_income, amount)?,
            ..self
        })
    }

    fn debit_expense(self, amount: MoneyCents) -> Reconciled<Self> {
        Ok(Self {
            amount: sub(self.amount, amount)?,
            total_expenses: add(self.total_expenses, amount)?,
            ..self
        })
    }

    /// Applies an effect without any feasibility check.
    fn apply_unchecked(self, effect: TxEffect) -> Reconciled<Self> {
        match effect.kind {
            TransactionKind::Income => self.credit_income(effect.amount),
            TransactionKind::Expense => self.debit_expense(effect.amount),
        }
    }
}

/// Applies a brand new transaction to `wallet`.
///
/// An expense larger than the current `amount` is rejected.
pub fn apply_new(wallet: WalletBalance, effect: TxEffect) -> Reconciled<WalletBalance> {
    if effect.kind == TransactionKind::Expense && wallet.amount < effect.amount {
        return Err(Rejection::InsufficientBalance {
            available: wallet.amount,
            required: effect.amount,
        });
    }
    wallet.apply_unchecked(effect)
}

/// Removes the contribution of `effect` from `wallet`.
///
/// The result may be negative; callers decide how to treat it.
pub fn revert(wallet: WalletBalance, effect: TxEffect) -> Reconciled<WalletBalance> {
    match effect.kind {
        TransactionKind::Income => Ok(WalletBalance {
            amount: sub(wallet.amount, effect.amount)?,
            total_income: sub(wallet.total_income, effect.amount)?,
            ..wallet
        }),
        TransactionKind::Expense => Ok(WalletBalance {
            amount: add(wallet.amount, effect.amount)?,
            total_expenses: sub(wallet.total_expenses, effect.amount)?,
            ..wallet
        }),
    }
}

fn ensure_non_negative(
    before: WalletBalance,
    after: WalletBalance,
) -> Reconciled<WalletBalance> {
    if after.amount.is_negative() {
        return Err(Rejection::InsufficientBalance {
            available: before.amount,
            required: sub(before.amount, after.amount)?,
        });
    }
    Ok(after)
}

/// Edits a transaction that stays on the same wallet.
///
/// `old` must already be reflected in `wallet`.
pub fn edit_same_wallet(
    old: TxEffect,
    new: TxEffect,
    wallet: WalletBalance,
) -> Reconciled<WalletBalance> {
    let next = match (old.kind, new.kind) {
        (TransactionKind::Income, TransactionKind::Income) => {
            // delta may be negative
            let delta = sub(new.amount, old.amount)?;
            WalletBalance {
                amount: add(wallet.amount, delta)?,
                total_income: add(wallet.total_income, delta)?,
                ..wallet
            }
        }
        (TransactionKind::Expense, TransactionKind::Expense) => {
            let delta = sub(new.amount, old.amount)?;
            if delta.is_positive() && wallet.amount < delta {
                return Err(Rejection::InsufficientBalance {
                    available: wallet.amount,
                    required: delta,
                });
            }
            WalletBalance {
                amount: sub(wallet.amount, delta)?,
                total_expenses: add(wallet.total_expenses, delta)?,
                ..wallet
            }
        }
        (TransactionKind::Income, TransactionKind::Expense) => {
            // Sufficiency is judged after the old income is gone; the
            // post-condition below covers it.
            revert(wallet, old)?.debit_expense(new.amount)?
        }
        (TransactionKind::Expense, TransactionKind::Income) => {
            revert(wallet, old)?.credit_income(new.amount)?
        }
    };

    ensure_non_negative(wallet, next)
}

/// Moves a transaction from `old_wallet` to `new_wallet`, possibly changing
/// its kind and amount.
///
/// Both snapshots are returned or neither is: a rejection on either side
/// rejects the whole move.
pub fn edit_cross_wallet(
    old: TxEffect,
    old_wallet: WalletBalance,
    new: TxEffect,
    new_wallet: WalletBalance,
) -> Reconciled<(WalletBalance, WalletBalance)> {
    let reverted = ensure_non_negative(old_wallet, revert(old_wallet, old)?)?;
    let applied = apply_new(new_wallet, new)?;
    Ok((reverted, applied))
}

/// Removes a deleted transaction from its wallet.
///
/// A negative result means the cached totals were already wrong; it is
/// surfaced instead of clamped.
pub fn revert_on_delete(tx: TxEffect, wallet: WalletBalance) -> Reconciled<WalletBalance> {
    let reverted = revert(wallet, tx)?;
    if reverted.amount.is_negative() {
        return Err(Rejection::WouldGoNegative {
            resulting: reverted.amount,
        });
    }
    Ok(reverted)
}

/// Recomputes wallet totals from a complete transaction history.
pub fn replay<I>(effects: I) -> Reconciled<WalletBalance>
where
    I: IntoIterator<Item = TxEffect>,
{
    effects
        .into_iter()
        .try_fold(WalletBalance::EMPTY, WalletBalance::apply_unchecked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn income(cents: i64) -> TxEffect {
        TxEffect {
            kind: TransactionKind::Income,
            amount: MoneyCents::new(cents),
        }
    }

    fn expense(cents: i64) -> TxEffect {
        TxEffect {
            kind: TransactionKind::Expense,
            amount: MoneyCents::new(cents),
        }
    }

    fn wallet(amount: i64, total_income: i64, total_expenses: i64) -> WalletBalance {
        WalletBalance::new(amount, total_income, total_expenses)
    }

    #[test]
    fn apply_income_credits_amount_and_income() {
        let next = apply_new(wallet(100, 300, 200), income(50)).unwrap();
        assert_eq!(next, wallet(150, 350, 200));
        assert!(next.is_balanced());
    }

    #[test]
    fn apply_expense_debits_amount_and_adds_expense() {
        let next = apply_new(wallet(100, 100, 0), expense(100)).unwrap();
        assert_eq!(next, wallet(0, 100, 100));
    }

    #[test]
    fn apply_expense_over_balance_is_rejected() {
        let err = apply_new(wallet(50, 50, 0), expense(100)).unwrap_err();
        assert_eq!(
            err,
            Rejection::InsufficientBalance {
                available: MoneyCents::new(50),
                required: MoneyCents::new(100),
            }
        );
    }

    #[test]
    fn income_to_income_applies_signed_delta() {
        let start = wallet(500, 500, 0);
        assert_eq!(
            edit_same_wallet(income(200), income(350), start).unwrap(),
            wallet(650, 650, 0)
        );
        assert_eq!(
            edit_same_wallet(income(200), income(120), start).unwrap(),
            wallet(420, 420, 0)
        );
    }

    #[test]
    fn income_to_income_shrink_below_zero_is_rejected() {
        // 200 income, 150 already spent: the income cannot shrink to 10.
        let start = wallet(50, 200, 150);
        let err = edit_same_wallet(income(200), income(10), start).unwrap_err();
        assert_eq!(
            err,
            Rejection::InsufficientBalance {
                available: MoneyCents::new(50),
                required: MoneyCents::new(190),
            }
        );
    }

    #[test]
    fn expense_to_expense_growth_needs_balance() {
        let start = wallet(30, 100, 70);
        assert_eq!(
            edit_same_wallet(expense(70), expense(100), start).unwrap(),
            wallet(0, 100, 100)
        );
        let err = edit_same_wallet(expense(70), expense(101), start).unwrap_err();
        assert_eq!(
            err,
            Rejection::InsufficientBalance {
                available: MoneyCents::new(30),
                required: MoneyCents::new(31),
            }
        );
    }

    #[test]
    fn expense_to_expense_shrink_gives_money_back() {
        let start = wallet(30, 100, 70);
        assert_eq!(
            edit_same_wallet(expense(70), expense(20), start).unwrap(),
            wallet(80, 100, 20)
        );
    }

    #[test]
    fn income_to_expense_reverts_then_applies() {
        // Wallet held 100 before a 200 income was recorded.
        let start = wallet(300, 300, 0);
        let next = edit_same_wallet(income(200), expense(50), start).unwrap();
        assert_eq!(next, wallet(50, 100, 50));
        assert!(next.is_balanced());
    }

    #[test]
    fn income_to_expense_checks_balance_after_revert() {
        let start = wallet(300, 300, 0);
        assert!(edit_same_wallet(income(200), expense(100), start).is_ok());
        assert!(matches!(
            edit_same_wallet(income(200), expense(101), start),
            Err(Rejection::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn expense_to_income_reverts_then_applies() {
        let start = wallet(60, 100, 40);
        let next = edit_same_wallet(expense(40), income(25), start).unwrap();
        assert_eq!(next, wallet(125, 125, 0));
    }

    #[test]
    fn cross_wallet_moves_expense() {
        let a = wallet(100, 130, 30);
        let b = wallet(200, 200, 0);
        let (a, b) = edit_cross_wallet(expense(30), a, expense(30), b).unwrap();
        assert_eq!(a.amount, MoneyCents::new(130));
        assert_eq!(b.amount, MoneyCents::new(170));
        assert!(a.is_balanced() && b.is_balanced());
    }

    #[test]
    fn cross_wallet_rejects_when_target_is_short() {
        let a = wallet(100, 130, 30);
        let b = wallet(10, 10, 0);
        let err = edit_cross_wallet(expense(30), a, expense(30), b).unwrap_err();
        assert_eq!(
            err,
            Rejection::InsufficientBalance {
                available: MoneyCents::new(10),
                required: MoneyCents::new(30),
            }
        );
    }

    #[test]
    fn cross_wallet_rejects_when_source_would_go_negative() {
        // The income being moved away has already been spent on the source.
        let a = wallet(20, 100, 80);
        let b = wallet(0, 0, 0);
        assert!(matches!(
            edit_cross_wallet(income(100), a, income(100), b),
            Err(Rejection::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn delete_revert_restores_previous_totals() {
        let before = wallet(100, 100, 0);
        let after = apply_new(before, expense(40)).unwrap();
        assert_eq!(revert_on_delete(expense(40), after).unwrap(), before);

        let after = apply_new(before, income(40)).unwrap();
        assert_eq!(revert_on_delete(income(40), after).unwrap(), before);
    }

    #[test]
    fn delete_revert_refuses_negative_result() {
        let corrupted = wallet(10, 10, 0);
        assert_eq!(
            revert_on_delete(income(25), corrupted).unwrap_err(),
            Rejection::WouldGoNegative {
                resulting: MoneyCents::new(-15),
            }
        );
    }

    #[test]
    fn replay_matches_incremental_application() {
        let history = [income(1000), expense(250), income(40), expense(790)];
        let mut incremental = WalletBalance::EMPTY;
        for effect in history {
            incremental = apply_new(incremental, effect).unwrap();
        }
        assert_eq!(replay(history).unwrap(), incremental);
        assert_eq!(replay([]).unwrap(), WalletBalance::EMPTY);
    }

    #[test]
    fn overflow_is_rejected() {
        let full = wallet(i64::MAX, i64::MAX, 0);
        assert_eq!(apply_new(full, income(1)).unwrap_err(), Rejection::Overflow);
    }
}
