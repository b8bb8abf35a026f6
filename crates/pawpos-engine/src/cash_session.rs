//! # Cash Session Manager
//!
//! The shop has one physical drawer, so at most one session is OPEN at a
//! time. The partial unique index `idx_cash_sessions_single_open` is what
//! enforces it; two concurrent opens cannot both commit.
//!
//! ## Lifecycle
//! ```text
//!   open_session ──► OPEN ──► close_session ──► CLOSED (terminal)
//!                     │
//!                     └── orders reference the session id; closing does
//!                         not block orders already pointing at it
//! ```

use chrono::Utc;
use tracing::{info, warn};

use pawpos_core::validation::{validate_actor, validate_drawer_amount};
use pawpos_core::{CashSession, CashSessionSummary, CoreError, Money, PaymentMethod};
use pawpos_db::repository::cash_session as session_repo;
use pawpos_db::DbError;

use crate::config::ClosingBalancePolicy;
use crate::error::EngineResult;
use crate::PosEngine;

const SINGLE_OPEN_INDEX: &str = "cash_sessions.status";

impl PosEngine {
    /// Opens the drawer.
    ///
    /// ## Returns
    /// * `Err(Conflict)` - another session is OPEN
    /// * `Err(Validation)` - negative opening balance, blank actor
    pub async fn open_session(
        &self,
        opened_by: &str,
        opening_balance: Money,
        notes: Option<&str>,
    ) -> EngineResult<CashSession> {
        validate_actor("opened_by", opened_by)?;
        validate_drawer_amount("opening_balance", opening_balance.cents())?;

        let mut conn = self.acquire().await?;
        let inserted =
            session_repo::insert_open(&mut conn, opened_by, opening_balance.cents(), notes, Utc::now())
                .await;

        match inserted {
            Ok(session) => {
                info!(
                    session_id = %session.id,
                    opened_by = %opened_by,
                    opening_balance = %opening_balance,
                    "Cash session opened"
                );
                Ok(session)
            }
            Err(err) if err.is_unique_violation_on(SINGLE_OPEN_INDEX) => {
                warn!(opened_by = %opened_by, "Cash session already open");
                Err(CoreError::Conflict("a cash session is already open".to_string()).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The OPEN session, if any.
    pub async fn get_active_session(&self) -> EngineResult<Option<CashSession>> {
        let mut conn = self.acquire().await?;
        Ok(session_repo::get_open(&mut conn).await?)
    }

    /// Closes the drawer and records the expected balance.
    ///
    /// ## Returns
    /// * `Err(NotFound)` - unknown session
    /// * `Err(InvalidState)` - session already CLOSED
    pub async fn close_session(
        &self,
        session_id: &str,
        closed_by: &str,
        closing_balance: Money,
        notes: Option<&str>,
    ) -> EngineResult<CashSession> {
        validate_actor("closed_by", closed_by)?;
        validate_drawer_amount("closing_balance", closing_balance.cents())?;

        let now = Utc::now();
        let mut tx = self.begin().await?;

        let session = session_repo::touch(&mut tx, session_id, now).await?;
        if !session.is_open() {
            warn!(session_id = %session_id, "Close requested on a closed cash session");
            return Err(CoreError::invalid_state("CashSession", session_id, session.status).into());
        }

        let expected = match self.config.closing_balance_policy {
            ClosingBalancePolicy::OpeningOnly => session.opening_balance(),
            ClosingBalancePolicy::OpeningPlusCash => {
                let cash = session_repo::method_total(&mut tx, session_id, PaymentMethod::Cash).await?;
                session.opening_balance() + Money::from_cents(cash)
            }
        };

        let closed = session_repo::close(
            &mut tx,
            session_id,
            closed_by,
            closing_balance.cents(),
            expected.cents(),
            notes,
            now,
        )
        .await?;
        tx.commit().await?;

        info!(
            session_id = %session_id,
            closed_by = %closed_by,
            closing_balance = %closing_balance,
            expected = %expected,
            discrepancy = ?closed.discrepancy().map(|d| d.cents()),
            "Cash session closed"
        );

        Ok(closed)
    }

    /// Order counts and payment totals of a session.
    pub async fn session_summary(&self, session_id: &str) -> EngineResult<CashSessionSummary> {
        let mut conn = self.acquire().await?;

        let session = session_repo::get(&mut conn, session_id)
            .await?
            .ok_or_else(|| DbError::not_found("CashSession", session_id))?;
        let counts = session_repo::order_counts(&mut conn, session_id).await?;
        let totals_by_method = session_repo::totals_by_method(&mut conn, session_id).await?;

        Ok(CashSessionSummary {
            session,
            order_count: counts.order_count,
            paid_count: counts.paid_count,
            cancelled_count: counts.cancelled_count,
            gross_sales_cents: counts.gross_sales_cents,
            totals_by_method,
        })
    }
}
