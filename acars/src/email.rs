//! Email composition and delivery for form submissions.

use lettre::{
    Address, AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use minijinja::{Environment, HtmlEscape, Value, context};
use serde::Serialize;

use crate::config::{BusinessConfig, Config, EmailTransportKind};
use crate::errors::{Error, Form, Result, ValidationError};
use crate::types::{CarListingSubmission, ContactSubmission};

const CONTACT_NOTIFICATION: &str = "contact_notification.html";
const CONTACT_CONFIRMATION: &str = "contact_confirmation.html";
const CAR_LISTING_NOTIFICATION: &str = "car_listing_notification.html";

/// Renders submission emails and hands them to the configured transport.
pub struct Notifier {
    transport: EmailTransport,
    from: Mailbox,
    business_mailbox: Mailbox,
    business: BusinessConfig,
    word_limit: usize,
    templates: Environment<'static>,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
    #[cfg(test)]
    Stub(lettre::transport::stub::AsyncStubTransport),
    /// Delivers the first `successful_sends` messages, then rejects every send
    #[cfg(test)]
    FailAfter {
        delivered: lettre::transport::stub::AsyncStubTransport,
        successful_sends: usize,
        attempts: std::sync::atomic::AtomicUsize,
    },
}

#[derive(Serialize)]
struct FileView<'a> {
    original_name: &'a str,
    generated_name: &'a str,
    size: String,
    mime_type: &'a str,
}

/// Escapes free text for HTML and turns each newline into `<br>`.
fn nl2br(value: &str) -> Value {
    Value::from_safe_string(HtmlEscape(value).to_string().replace('\n', "<br>"))
}

fn templates() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_filter("nl2br", nl2br);
    for (name, source) in [
        (CONTACT_NOTIFICATION, include_str!("../templates/contact_notification.html")),
        (CONTACT_CONFIRMATION, include_str!("../templates/contact_confirmation.html")),
        (CAR_LISTING_NOTIFICATION, include_str!("../templates/car_listing_notification.html")),
    ] {
        env.add_template(name, source).map_err(|e| Error::Internal {
            operation: format!("load email template {name}: {e}"),
        })?;
    }
    Ok(env)
}

impl Notifier {
    pub fn new(config: &Config) -> Result<Self> {
        let email_config = &config.email;

        let transport = match email_config.transport {
            EmailTransportKind::Smtp => {
                let smtp = &email_config.smtp;
                if !smtp.use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if smtp.use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(smtp.port)
                .credentials(Credentials::new(smtp.username.clone(), smtp.password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            EmailTransportKind::File => {
                // Use file transport for development/testing
                let emails_dir = &email_config.file.path;
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        Self::with_transport(config, transport)
    }

    /// Notifier backed by an in-memory transport that records every message.
    #[cfg(test)]
    pub fn with_stub(config: &Config, stub: lettre::transport::stub::AsyncStubTransport) -> Result<Self> {
        Self::with_transport(config, EmailTransport::Stub(stub))
    }

    /// Notifier whose relay accepts `successful_sends` messages and fails afterwards.
    #[cfg(test)]
    pub fn failing_after(config: &Config, successful_sends: usize) -> Result<Self> {
        Self::with_transport(
            config,
            EmailTransport::FailAfter {
                delivered: lettre::transport::stub::AsyncStubTransport::new_ok(),
                successful_sends,
                attempts: std::sync::atomic::AtomicUsize::new(0),
            },
        )
    }

    fn with_transport(config: &Config, transport: EmailTransport) -> Result<Self> {
        let from = parse_address(config.email.sender_address(), "sender")?;
        let business_address = parse_address(&config.business.email, "business")?;

        Ok(Self {
            transport,
            from: Mailbox::new(Some(config.email.from_name.clone()), from),
            business_mailbox: Mailbox::new(Some(config.business.name.clone()), business_address),
            business: config.business.clone(),
            word_limit: config.limits.max_description_words,
            templates: templates()?,
        })
    }

    /// Sends the business notification, then the confirmation to the submitter.
    ///
    /// Both messages are composed before anything is sent. If the notification fails the
    /// confirmation is not attempted.
    #[tracing::instrument(skip_all, fields(form = %Form::Contact))]
    pub async fn send_contact(&self, contact: &ContactSubmission) -> Result<()> {
        let submitter_address = contact
            .email
            .parse::<Address>()
            .map_err(|_| ValidationError::InvalidEmailFormat)?;
        let submitter = Mailbox::new(Some(contact.name.clone()), submitter_address);

        let notification = self.build_message(
            self.business_mailbox.clone(),
            Some(submitter.clone()),
            &format!("New Contact Form Submission from {}", contact.name),
            self.render_contact_notification(contact)?,
            Vec::new(),
        )?;

        let confirmation = self.build_message(
            submitter,
            None,
            &format!("Thank you for contacting {}", self.business.name),
            self.render_contact_confirmation(contact)?,
            Vec::new(),
        )?;

        self.deliver(notification, Form::Contact).await?;
        self.deliver(confirmation, Form::Contact).await
    }

    /// Sends the business notification for a car listing with every upload attached.
    #[tracing::instrument(skip_all, fields(form = %Form::SellCar, files = listing.files.len()))]
    pub async fn send_car_listing(&self, listing: &CarListingSubmission) -> Result<()> {
        let mut attachments = Vec::with_capacity(listing.files.len());
        for file in &listing.files {
            let content = tokio::fs::read(&file.storage_path).await.map_err(|e| Error::Internal {
                operation: format!("read upload {} for attachment: {e}", file.storage_path.display()),
            })?;
            let content_type = ContentType::parse(&file.mime_type)
                .or_else(|_| ContentType::parse("application/octet-stream"))
                .map_err(|e| Error::Internal {
                    operation: format!("parse attachment content type {}: {e}", file.mime_type),
                })?;
            attachments.push(Attachment::new(file.original_name.clone()).body(content, content_type));
        }

        let notification = self.build_message(
            self.business_mailbox.clone(),
            None,
            &format!("New Car Sale Submission: {} {}", listing.car_name, listing.car_model),
            self.render_car_listing_notification(listing)?,
            attachments,
        )?;

        self.deliver(notification, Form::SellCar).await
    }

    fn render(&self, template: &str, ctx: Value) -> Result<String> {
        self.templates
            .get_template(template)
            .and_then(|t| t.render(ctx))
            .map_err(|e| Error::Internal {
                operation: format!("render email template {template}: {e}"),
            })
    }

    fn render_contact_notification(&self, contact: &ContactSubmission) -> Result<String> {
        self.render(
            CONTACT_NOTIFICATION,
            context! {
                name => &contact.name,
                email => &contact.email,
                phone => &contact.phone,
                message => &contact.message,
                business => &self.business,
            },
        )
    }

    fn render_contact_confirmation(&self, contact: &ContactSubmission) -> Result<String> {
        self.render(
            CONTACT_CONFIRMATION,
            context! {
                name => &contact.name,
                message => &contact.message,
                business => &self.business,
            },
        )
    }

    fn render_car_listing_notification(&self, listing: &CarListingSubmission) -> Result<String> {
        let files: Vec<FileView<'_>> = listing
            .files
            .iter()
            .map(|f| FileView {
                original_name: &f.original_name,
                generated_name: &f.generated_name,
                size: f.display_size(),
                mime_type: &f.mime_type,
            })
            .collect();

        self.render(
            CAR_LISTING_NOTIFICATION,
            context! {
                car_name => &listing.car_name,
                car_model => &listing.car_model,
                description => &listing.description,
                word_count => listing.word_count,
                word_limit => self.word_limit,
                files => files,
                business => &self.business,
            },
        )
    }

    fn build_message(
        &self,
        to: Mailbox,
        reply_to: Option<Mailbox>,
        subject: &str,
        html: String,
        attachments: Vec<SinglePart>,
    ) -> Result<Message> {
        let mut builder = Message::builder().from(self.from.clone()).to(to).subject(subject);
        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(reply_to);
        }

        let message = if attachments.is_empty() {
            builder.header(ContentType::TEXT_HTML).body(html)
        } else {
            let body = attachments
                .into_iter()
                .fold(MultiPart::mixed().singlepart(SinglePart::html(html)), |body, part| body.singlepart(part));
            builder.multipart(body)
        };

        message.map_err(|e| Error::Internal {
            operation: format!("build email message: {e}"),
        })
    }

    async fn deliver(&self, message: Message, form: Form) -> Result<()> {
        let delivery_failed = |reason: String| Error::EmailDelivery { form, reason };

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| delivery_failed(e.to_string()))?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| delivery_failed(e.to_string()))?;
            }
            #[cfg(test)]
            EmailTransport::Stub(stub) => {
                stub.send(message).await.map_err(|e| delivery_failed(e.to_string()))?;
            }
            #[cfg(test)]
            EmailTransport::FailAfter {
                delivered,
                successful_sends,
                attempts,
            } => {
                if attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst) >= *successful_sends {
                    return Err(delivery_failed("relay rejected the message".to_string()));
                }
                delivered.send(message).await.map_err(|e| delivery_failed(e.to_string()))?;
            }
        }

        tracing::info!("Email delivered");
        Ok(())
    }

    /// Raw messages recorded by the stub transport, in send order.
    #[cfg(test)]
    pub async fn sent_messages(&self) -> Vec<(lettre::address::Envelope, String)> {
        match &self.transport {
            EmailTransport::Stub(stub) | EmailTransport::FailAfter { delivered: stub, .. } => stub.messages().await,
            _ => Vec::new(),
        }
    }
}

fn parse_address(address: &str, role: &str) -> Result<Address> {
    address.parse::<Address>().map_err(|e| Error::Internal {
        operation: format!("parse {role} email address '{address}': {e}"),
    })
}
