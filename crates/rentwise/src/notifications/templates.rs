//! Email bodies for every workflow notification.

use chrono::{DateTime, NaiveDate, Utc};

use crate::money::Cents;
use crate::workflows::leasing::render::escape_html;

use super::EmailMessage;

fn message(to: &str, subject: String, paragraphs: &[String], tag: &'static str) -> EmailMessage {
    let text_body = paragraphs.join("\n\n");
    let html_body = paragraphs
        .iter()
        .map(|paragraph| format!("<p>{}</p>", escape_html(paragraph)))
        .collect::<Vec<_>>()
        .join("\n");

    EmailMessage {
        to: to.to_string(),
        subject,
        text_body,
        html_body: Some(html_body),
        tag,
    }
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn signature_requested(to: &str, signer: &str, premises: &str, link: &str) -> EmailMessage {
    message(
        to,
        format!("Please sign your lease for {premises}"),
        &[
            format!("Hi {signer},"),
            format!("Your lease for {premises} is ready for your signature."),
            format!("Review and sign it here: {link}"),
            "Every tenant signs before the landlord countersigns. You will receive a copy once everyone has signed.".to_string(),
        ],
        "lease.signature_requested",
    )
}

pub fn countersignature_requested(
    to: &str,
    landlord: &str,
    premises: &str,
    link: &str,
) -> EmailMessage {
    message(
        to,
        format!("Tenants have signed the lease for {premises}"),
        &[
            format!("Hi {landlord},"),
            format!("Every tenant has signed the lease for {premises}."),
            format!("Countersign it here to execute the lease: {link}"),
        ],
        "lease.countersignature_requested",
    )
}

pub fn lease_executed(to: &str, name: &str, premises: &str, start: NaiveDate) -> EmailMessage {
    message(
        to,
        format!("Lease executed for {premises}"),
        &[
            format!("Hi {name},"),
            format!(
                "The lease for {premises} has been signed by every party and is now in effect starting {}.",
                long_date(start)
            ),
            "A copy of the executed lease and its audit trail is available in your account.".to_string(),
        ],
        "lease.executed",
    )
}

pub fn lease_declined(
    to: &str,
    landlord: &str,
    premises: &str,
    signer: &str,
    reason: &str,
) -> EmailMessage {
    message(
        to,
        format!("Lease declined for {premises}"),
        &[
            format!("Hi {landlord},"),
            format!("{signer} declined to sign the lease for {premises}."),
            format!("Reason given: {reason}"),
            "The lease has been closed and the unit is available again.".to_string(),
        ],
        "lease.declined",
    )
}

pub fn lease_voided(to: &str, name: &str, premises: &str, reason: &str) -> EmailMessage {
    message(
        to,
        format!("Lease for {premises} has been voided"),
        &[
            format!("Hi {name},"),
            format!("The landlord voided the pending lease for {premises}. Any signature request you received for it is no longer valid."),
            format!("Reason given: {reason}"),
        ],
        "lease.voided",
    )
}

pub fn application_approved(
    to: &str,
    applicant: &str,
    premises: &str,
    move_in: NaiveDate,
) -> EmailMessage {
    message(
        to,
        format!("Your application for {premises} was approved"),
        &[
            format!("Hi {applicant},"),
            format!(
                "Good news: your rental application for {premises} has been approved for a move-in on {}.",
                long_date(move_in)
            ),
            "You will receive a separate email with a link to review and sign your lease.".to_string(),
        ],
        "application.approved",
    )
}

pub fn application_approved_landlord(
    to: &str,
    landlord: &str,
    applicant: &str,
    premises: &str,
) -> EmailMessage {
    message(
        to,
        format!("Lease sent to {applicant} for {premises}"),
        &[
            format!("Hi {landlord},"),
            format!("The application from {applicant} for {premises} was approved and the lease has been sent for signature."),
            "The unit is reserved until the lease is executed, declined or voided.".to_string(),
        ],
        "application.approved_landlord",
    )
}

pub fn application_rejected(
    to: &str,
    applicant: &str,
    premises: &str,
    reason: &str,
) -> EmailMessage {
    message(
        to,
        format!("Update on your application for {premises}"),
        &[
            format!("Hi {applicant},"),
            format!("After review, we are unable to approve your rental application for {premises}."),
            format!("Principal reason: {reason}"),
            "You have the right to request the screening information used in this decision and to dispute its accuracy. We comply with the Fair Housing Act and do not discriminate on any protected basis.".to_string(),
        ],
        "application.rejected",
    )
}

pub fn booking_confirmed(
    to: &str,
    contractor: &str,
    starts_at: DateTime<Utc>,
    deposit: Cents,
) -> EmailMessage {
    let deposit_line = if deposit.is_positive() {
        format!("A deposit of {deposit} was charged to secure the booking.")
    } else {
        "No deposit was required for this booking.".to_string()
    };
    message(
        to,
        format!("Booking confirmed with {contractor}"),
        &[
            format!(
                "Your booking with {contractor} is confirmed for {} UTC.",
                starts_at.format("%B %-d, %Y at %H:%M")
            ),
            deposit_line,
        ],
        "booking.confirmed",
    )
}

pub fn booking_cancelled(
    to: &str,
    contractor: &str,
    starts_at: DateTime<Utc>,
    refund: Cents,
) -> EmailMessage {
    let refund_line = if refund.is_positive() {
        format!("A refund of {refund} has been issued to the original payment method.")
    } else {
        "No refund applies under the contractor's cancellation policy.".to_string()
    };
    message(
        to,
        format!("Booking with {contractor} cancelled"),
        &[
            format!(
                "Your booking with {contractor} for {} UTC has been cancelled.",
                starts_at.format("%B %-d, %Y at %H:%M")
            ),
            refund_line,
        ],
        "booking.cancelled",
    )
}

pub fn invoice_issued(
    to: &str,
    tenant: &str,
    number: &str,
    total: Cents,
    due: NaiveDate,
) -> EmailMessage {
    message(
        to,
        format!("Invoice {number} for {total}"),
        &[
            format!("Hi {tenant},"),
            format!("Invoice {number} for {total} is due on {}.", long_date(due)),
            "You can pay online from your tenant portal.".to_string(),
        ],
        "invoice.issued",
    )
}

pub fn rent_reminder(
    to: &str,
    tenant: &str,
    number: &str,
    balance: Cents,
    due: NaiveDate,
    timing: &str,
) -> EmailMessage {
    message(
        to,
        format!("Rent reminder: {balance} {timing}"),
        &[
            format!("Hi {tenant},"),
            format!(
                "This is a reminder that {balance} on invoice {number} {timing} (due {}).",
                long_date(due)
            ),
            "If you have already paid, please disregard this message.".to_string(),
        ],
        "reminder.rent",
    )
}

pub fn maintenance_assigned(
    to: &str,
    contractor: &str,
    title: &str,
    location: &str,
    due_by: DateTime<Utc>,
) -> EmailMessage {
    message(
        to,
        format!("New work order: {title}"),
        &[
            format!("Hi {contractor},"),
            format!("You have been assigned \"{title}\" at {location}."),
            format!(
                "Please resolve it by {}.",
                due_by.format("%B %-d, %Y at %H:%M UTC")
            ),
        ],
        "maintenance.assigned",
    )
}

pub fn team_invitation(to: &str, account: &str, role: &str, invited_by: &str) -> EmailMessage {
    message(
        to,
        format!("You have been invited to manage {account}"),
        &[
            format!("{invited_by} invited you to join {account} as {role}."),
            "Sign in with this email address to accept the invitation.".to_string(),
        ],
        "team.invitation",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_body_is_escaped() {
        let email = signature_requested(
            "avery@example.com",
            "Avery <Chen>",
            "Unit 2B",
            "http://localhost/sign/sig-1",
        );
        assert_eq!(email.tag, "lease.signature_requested");
        assert!(email.text_body.contains("Hi Avery <Chen>,"));
        assert!(email
            .html_body
            .as_deref()
            .unwrap_or_default()
            .contains("Hi Avery &lt;Chen&gt;,"));
    }

    #[test]
    fn reminder_subject_mentions_timing() {
        let email = rent_reminder(
            "avery@example.com",
            "Avery",
            "INV-000004",
            Cents::from_dollars(1_200),
            NaiveDate::from_ymd_opt(2024, 7, 1).expect("date"),
            "is due in 3 days",
        );
        assert_eq!(email.subject, "Rent reminder: $1,200.00 is due in 3 days");
    }
}
