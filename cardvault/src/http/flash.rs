/// One-shot notices shown on the next rendered page. Only the short code
/// travels in the cookie, never the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    AccountCreated,
    CardAdded,
    CardUnavailable,
    LoginRequired,
}

impl Flash {
    const ALL: [Flash; 4] = [
        Flash::AccountCreated,
        Flash::CardAdded,
        Flash::CardUnavailable,
        Flash::LoginRequired,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Flash::AccountCreated => "account-created",
            Flash::CardAdded => "card-added",
            Flash::CardUnavailable => "card-unavailable",
            Flash::LoginRequired => "login-required",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flash| flash.code() == code)
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::AccountCreated => "Account created successfully!",
            Flash::CardAdded => "Credit card added successfully!",
            Flash::CardUnavailable => "Credit card not found or unauthorized.",
            Flash::LoginRequired => "Please log in to continue.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Flash;

    #[test]
    fn every_code_maps_back_to_its_flash() {
        for flash in Flash::ALL {
            assert_eq!(Flash::from_code(flash.code()), Some(flash));
        }
    }

    #[test]
    fn unknown_codes_are_ignored() {
        assert_eq!(Flash::from_code(""), None);
        assert_eq!(Flash::from_code("<script>"), None);
        assert_eq!(Flash::from_code("Card-Added"), None);
    }
}
