//! # Checkout Builder
//!
//! Turns a groomed appointment into a pre-filled order request: one line
//! per booked service, then whatever else the quote carries.

use std::collections::HashSet;

use pawpos_core::{CheckoutDraft, NewOrderItem};
use pawpos_db::repository::{billing, customer};
use pawpos_db::DbError;

use crate::error::EngineResult;
use crate::PosEngine;

fn service_line(name: &str, pet_name: &str) -> String {
    format!("Serviço: {name} ({pet_name})")
}

impl PosEngine {
    /// Draft order items for an appointment.
    ///
    /// ## Returns
    /// * `Err(NotFound)` - unknown appointment
    pub async fn checkout_from_appointment(&self, appointment_id: &str) -> EngineResult<CheckoutDraft> {
        let mut conn = self.acquire().await?;

        let appointment = billing::get_appointment(&mut conn, appointment_id)
            .await?
            .ok_or_else(|| DbError::not_found("Appointment", appointment_id))?;
        let owner = customer::require(&mut conn, &appointment.customer_id).await?;

        let mut items = Vec::new();
        let mut seen_services = HashSet::new();

        for service in billing::appointment_services(&mut conn, &appointment.id).await? {
            items.push(NewOrderItem::service(
                &service.id,
                service_line(&service.name, &appointment.pet_name),
                1,
                service.base_price(),
            ));
            seen_services.insert(service.id);
        }

        if let Some(quote_id) = &appointment.quote_id {
            for quoted in billing::quote_items(&mut conn, quote_id).await? {
                if let Some(service_id) = &quoted.service_id {
                    if !seen_services.insert(service_id.clone()) {
                        continue;
                    }
                }

                items.push(NewOrderItem {
                    product_id: quoted.product_id,
                    service_id: quoted.service_id,
                    description: quoted.description,
                    quantity: quoted.quantity,
                    unit_price_cents: quoted.price_cents,
                    discount_cents: quoted.discount_cents,
                });
            }
        }

        Ok(CheckoutDraft {
            appointment_id: appointment.id,
            customer_id: owner.id,
            customer_name: owner.name,
            pet_name: appointment.pet_name,
            items,
        })
    }
}
