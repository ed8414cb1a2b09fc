//! Balance reconstruction for activity feeds and monthly statements.
//!
//! Balances are never stored per entry; every view rebuilds them from the
//! immutable ledger, either backward from the current balance (activity feed)
//! or forward from the opening balance of a month (statement).

pub mod period;
pub mod reconstruct;
pub mod reconstructor;
pub mod render;

#[cfg(test)]
mod reconstruct_props;

pub use period::{ActivityRange, StatementPeriod};
pub use reconstruct::{MovementLine, Replay, StatementLine, closed_form_balance, replay_from, rewind_from};
pub use reconstructor::{
    CARD_MOVEMENTS_LIMIT, DEFAULT_MOVEMENTS_LIMIT, MAX_MOVEMENTS_LIMIT, PeriodStatement,
    StatementReconstructor,
};
pub use render::{
    PageLayout, RenderError, StatementDocument, StatementHeader, StatementRenderer, StatementRow,
    TextStatementRenderer,
};
