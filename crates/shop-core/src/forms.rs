//! Lead, order and contact form handling.
//!
//! Validation runs before any request is built; a `ValidationError` never
//! reaches the network. Nothing here retries: every failure is terminal until
//! the shopper submits again.

use shop_api_types::{LeadRequest, OrderRequest};
use shop_client::{ApiError, FormPost, StorefrontApi};
use thiserror::Error;
use tracing::warn;

pub const MSG_LEAD_OK: &str = "Спасибо! Ваша заявка отправлена.";
pub const MSG_LEAD_FAILED: &str = "Не удалось отправить форму. Попробуйте позже.";
pub const MSG_CONTACT_FAILED: &str = "Произошла ошибка при отправке формы. Попробуйте еще раз.";
pub const MSG_CONTACT_REJECTED: &str = "Произошла ошибка при отправке формы";
pub const MSG_CONTACT_THANKS: &str = "Спасибо! Мы свяжемся с вами в ближайшее время.";

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Корзина пуста.")]
    CartEmpty,
    #[error("Укажите имя.")]
    NameRequired,
    #[error("Укажите телефон или email.")]
    ContactRequired,
    #[error("Пожалуйста, введите ваше имя")]
    ContactNameRequired,
    #[error("Пожалуйста, введите корректный номер телефона")]
    PhoneInvalid,
    #[error("Пожалуйста, введите сообщение")]
    MessageRequired,
    #[error("Необходимо согласие на обработку персональных данных")]
    ConsentRequired,
}

impl ValidationError {
    /// Which field should receive focus after the alert.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::NameRequired | Self::ContactNameRequired => Some("name"),
            Self::PhoneInvalid => Some("phone"),
            Self::MessageRequired => Some("message"),
            Self::CartEmpty | Self::ContactRequired | Self::ConsentRequired => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Invalid(ValidationError),
    Sent(String),
    Failed(String),
}

impl FormOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Sent(_))
    }

    pub fn message(&self) -> String {
        match self {
            Self::Invalid(err) => err.to_string(),
            Self::Sent(msg) | Self::Failed(msg) => msg.clone(),
        }
    }
}

fn require_name_and_contact(name: &str, phone: &str, email: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    if phone.is_empty() && email.is_empty() {
        return Err(ValidationError::ContactRequired);
    }
    Ok(())
}

/// `.js-lead-form` fields (`NAME`, `EMAIL`, `PHONE`, `MESSAGE`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadForm {
    pub lead_type: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl LeadForm {
    pub fn validate(&self) -> Result<LeadRequest, ValidationError> {
        let req = LeadRequest {
            lead_type: self.lead_type.trim().to_owned(),
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            message: self.message.trim().to_owned(),
        };
        require_name_and_contact(&req.name, &req.phone, &req.email)?;
        Ok(req)
    }
}

pub async fn submit_lead<A: StorefrontApi>(api: &A, form: &LeadForm, success_text: Option<&str>) -> FormOutcome {
    let req = match form.validate() {
        Ok(req) => req,
        Err(err) => return FormOutcome::Invalid(err),
    };
    match api.submit_lead(&req).await {
        Ok(resp) => FormOutcome::Sent(
            resp.message
                .filter(|m| !m.trim().is_empty())
                .or_else(|| success_text.map(str::to_owned))
                .unwrap_or_else(|| MSG_LEAD_OK.to_owned()),
        ),
        Err(err) => {
            warn!(lead_type = %req.lead_type, "lead submit failed: {}", err);
            FormOutcome::Failed(err.user_message().unwrap_or(MSG_LEAD_FAILED).to_owned())
        }
    }
}

/// Checkout form rendered inside the cart modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub comment: String,
}

impl OrderForm {
    pub fn validate(&self, cart_is_empty: bool) -> Result<OrderRequest, ValidationError> {
        if cart_is_empty {
            return Err(ValidationError::CartEmpty);
        }
        let req = OrderRequest {
            name: self.name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            email: self.email.trim().to_owned(),
            comment: self.comment.trim().to_owned(),
        };
        require_name_and_contact(&req.name, &req.phone, &req.email)?;
        Ok(req)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Callback,
    Feedback,
    Consultation,
}

impl ContactKind {
    pub const ALL: [ContactKind; 3] = [Self::Callback, Self::Feedback, Self::Consultation];

    pub fn form_id(&self) -> &'static str {
        match self {
            Self::Callback => "callback_form",
            Self::Feedback => "feedback_form",
            Self::Consultation => "consultation_form",
        }
    }

    pub fn modal_id(&self) -> &'static str {
        match self {
            Self::Callback => "dev_modal_callback",
            Self::Feedback => "dev_modal_feedback",
            Self::Consultation => "dev_modal_consultation",
        }
    }

    pub fn requires_message(&self) -> bool {
        matches!(self, Self::Feedback)
    }
}

const MIN_PHONE_LEN: usize = 10;

/// Callback / feedback / consultation forms, posted url-encoded to their
/// `action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactForm {
    pub kind: ContactKind,
    pub action: String,
    pub name: String,
    pub phone: String,
    pub message: String,
    /// `None` when the form has no required consent checkbox.
    pub consent: Option<bool>,
    pub csrf_token: String,
    /// Every serialized field, in document order.
    pub fields: Vec<(String, String)>,
}

impl ContactForm {
    pub fn validate(&self) -> Result<FormPost, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::ContactNameRequired);
        }
        if self.phone.trim().chars().count() < MIN_PHONE_LEN {
            return Err(ValidationError::PhoneInvalid);
        }
        if self.kind.requires_message() && self.message.trim().is_empty() {
            return Err(ValidationError::MessageRequired);
        }
        if self.consent == Some(false) {
            return Err(ValidationError::ConsentRequired);
        }
        Ok(FormPost {
            action: self.action.clone(),
            fields: self.fields.clone(),
            csrf_token: self.csrf_token.clone(),
        })
    }
}

pub async fn submit_contact<A: StorefrontApi>(api: &A, form: &ContactForm) -> FormOutcome {
    let post = match form.validate() {
        Ok(post) => post,
        Err(err) => return FormOutcome::Invalid(err),
    };
    match api.submit_form(&post).await {
        Ok(resp) if resp.success => FormOutcome::Sent(MSG_CONTACT_THANKS.to_owned()),
        Ok(resp) => FormOutcome::Failed(
            resp.message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| MSG_CONTACT_REJECTED.to_owned()),
        ),
        Err(ApiError::Application { message }) => {
            FormOutcome::Failed(message.unwrap_or_else(|| MSG_CONTACT_REJECTED.to_owned()))
        }
        Err(err) => {
            warn!(form = form.kind.form_id(), "contact form failed: {}", err);
            FormOutcome::Failed(err.user_message().unwrap_or(MSG_CONTACT_FAILED).to_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_client::endpoints;
    use shop_client::memory::InMemoryStorefront;

    fn contact(kind: ContactKind) -> ContactForm {
        ContactForm {
            kind,
            action: "/forms/callback/".into(),
            name: "Иван".into(),
            phone: "+7 (700) 123-45-67".into(),
            message: String::new(),
            consent: Some(true),
            csrf_token: "tok".into(),
            fields: vec![("name".into(), "Иван".into())],
        }
    }

    #[test]
    fn order_validation_order() {
        let form = OrderForm::default();
        assert_eq!(form.validate(true), Err(ValidationError::CartEmpty));
        assert_eq!(form.validate(false), Err(ValidationError::NameRequired));

        let form = OrderForm {
            name: "Анна".into(),
            ..Default::default()
        };
        assert_eq!(form.validate(false), Err(ValidationError::ContactRequired));
        assert_eq!(ValidationError::ContactRequired.to_string(), "Укажите телефон или email.");
    }

    #[test]
    fn contact_validation_rules() {
        let mut form = contact(ContactKind::Feedback);
        assert_eq!(form.validate(), Err(ValidationError::MessageRequired));
        form.message = "Вопрос".into();
        assert!(form.validate().is_ok());

        form.phone = "12345".into();
        assert_eq!(form.validate(), Err(ValidationError::PhoneInvalid));
        assert_eq!(ValidationError::PhoneInvalid.field(), Some("phone"));

        let mut form = contact(ContactKind::Callback);
        form.consent = Some(false);
        assert_eq!(form.validate(), Err(ValidationError::ConsentRequired));
        form.consent = None;
        assert!(form.validate().is_ok());
    }

    #[tokio::test]
    async fn lead_success_prefers_server_message() -> anyhow::Result<()> {
        let api = InMemoryStorefront::new();
        let form = LeadForm {
            lead_type: "consultation".into(),
            name: " Олег ".into(),
            email: "oleg@example.com".into(),
            ..Default::default()
        };
        let outcome = submit_lead(&api, &form, Some("Готово")).await;
        assert_eq!(outcome, FormOutcome::Sent("Заявка принята.".into()));

        let body = api.calls_to(endpoints::LEADS)[0].body.clone().unwrap_or_default();
        assert_eq!(body["name"], "Олег");
        assert_eq!(body["lead_type"], "consultation");
        Ok(())
    }

    #[tokio::test]
    async fn lead_failure_uses_fallback_text() -> anyhow::Result<()> {
        let api = InMemoryStorefront::new();
        api.fail_next(ApiError::Network("offline".into()));
        let form = LeadForm {
            lead_type: "callback".into(),
            name: "Олег".into(),
            phone: "+77001234567".into(),
            ..Default::default()
        };
        let outcome = submit_lead(&api, &form, None).await;
        assert_eq!(outcome, FormOutcome::Failed(MSG_LEAD_FAILED.into()));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_contact_form_sends_nothing() -> anyhow::Result<()> {
        let api = InMemoryStorefront::new();
        let mut form = contact(ContactKind::Consultation);
        form.name.clear();
        let outcome = submit_contact(&api, &form).await;
        assert_eq!(outcome.message(), "Пожалуйста, введите ваше имя");
        assert!(api.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn contact_server_rejection_is_shown() -> anyhow::Result<()> {
        let api = InMemoryStorefront::new();
        api.fail_next(ApiError::Application { message: Some("Спам".into()) });
        let outcome = submit_contact(&api, &contact(ContactKind::Callback)).await;
        assert_eq!(outcome, FormOutcome::Failed("Спам".into()));

        let outcome = submit_contact(&api, &contact(ContactKind::Callback)).await;
        assert!(outcome.is_success());
        assert_eq!(api.calls_to("/forms/callback/").len(), 2);
        Ok(())
    }
}
