//! Verification links and the two messages the workflow sends.

use crate::{config::CoreConfig, handlers::RESULT_PATH, mailer::OutgoingEmail};
use url::form_urlencoded;
use uuid::Uuid;

/// Build the API link that confirms `email` for a result.
///
/// `{api_base_url}/result/{id}/verify-email?email={email}&token={token}`
pub fn verification_link_build(config: &CoreConfig, id: Uuid, email: &str, token: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("email", email)
        .append_pair("token", token)
        .finish();

    format!(
        "{}{}/{}/verify-email?{}",
        config.api_base_url.trim_end_matches('/'),
        RESULT_PATH,
        id,
        query
    )
}

/// Build the UI link to a result page.
pub fn result_link_build(config: &CoreConfig, id: Uuid) -> String {
    format!(
        "{}{}/{}",
        config.ui_base_url.trim_end_matches('/'),
        RESULT_PATH,
        id
    )
}

/// Message carrying the confirmation link.
pub fn verification_message(config: &CoreConfig, id: Uuid, email: &str, token: &str) -> OutgoingEmail {
    let link = verification_link_build(config, id, email, token);
    OutgoingEmail {
        to: email.to_owned(),
        subject: "Confirm your email address".to_string(),
        body: format!(
            "Please confirm that you want your personality test result sent to this address \
             by opening this link:\n\n{link}\n\nIf you did not request this, you can ignore this email."
        ),
    }
}

/// Message sent once an email has been bound to a result.
pub fn confirmation_message(config: &CoreConfig, id: Uuid, email: &str) -> OutgoingEmail {
    let link = result_link_build(config, id);
    OutgoingEmail {
        to: email.to_owned(),
        subject: "Your personality test result".to_string(),
        body: format!(
            "Your email address has been confirmed.\n\nYou can view your result at any time here:\n\n{link}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CoreConfig {
        CoreConfig {
            api_base_url: "https://api.example.com/".to_string(),
            ui_base_url: "https://example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn verification_link_encodes_query_values() {
        let id = Uuid::nil();
        let link = verification_link_build(&config(), id, "a+b@x.com", "tok_en-1");

        assert_eq!(
            link,
            "https://api.example.com/result/00000000-0000-0000-0000-000000000000/verify-email\
             ?email=a%2Bb%40x.com&token=tok_en-1"
        );
    }

    #[test]
    fn messages_address_the_candidate_email() {
        let id = Uuid::new_v4();
        let request = verification_message(&config(), id, "a@x.com", "t");
        assert_eq!(request.to, "a@x.com");
        assert!(request.body.contains(&format!("/result/{id}/verify-email")));

        let confirmed = confirmation_message(&config(), id, "a@x.com");
        assert!(confirmed.body.contains(&format!("https://example.com/result/{id}")));
    }
}
