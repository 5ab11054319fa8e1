//! HTML pages. Everything user supplied goes through [`escape_html`].

use axum::response::Html;

use crate::store::CreditCard;

pub fn home(notice: Option<&str>, cards: Option<&[CreditCard]>) -> Html<String> {
    let body = match cards {
        None => String::from(
            "<p>Keep your cards in one place.</p>\n\
             <ul>\n<li><a href=\"/signup\">Sign up</a></li>\n<li><a href=\"/login\">Log in</a></li>\n</ul>\n",
        ),
        Some(cards) => {
            let mut body = String::from(
                "<ul>\n<li><a href=\"/create_credit_card\">Add a credit card</a></li>\n\
                 <li><a href=\"/logout\">Log out</a></li>\n</ul>\n",
            );
            if cards.is_empty() {
                body.push_str("<p>No cards stored yet.</p>\n");
            } else {
                body.push_str("<h2>Your cards</h2>\n<ul>\n");
                for card in cards {
                    body.push_str(&format!(
                        "<li><a href=\"/view_credit_card/{id}\">Card #{id}</a></li>\n",
                        id = card.id
                    ));
                }
                body.push_str("</ul>\n");
            }
            body
        }
    };
    layout("Home", notice, &body)
}

pub fn signup(notice: Option<&str>) -> Html<String> {
    let body = "<form method=\"post\" action=\"/signup\">\n\
        <label>Username <input name=\"username\" required minlength=\"3\"></label>\n\
        <label>Password <input name=\"password\" type=\"password\" required minlength=\"8\"></label>\n\
        <button type=\"submit\">Sign up</button>\n\
        </form>\n\
        <p>Already registered? <a href=\"/login\">Log in</a></p>\n";
    layout("Sign up", notice, body)
}

pub fn login(notice: Option<&str>) -> Html<String> {
    let body = "<form method=\"post\" action=\"/login\">\n\
        <label>Username <input name=\"username\" required></label>\n\
        <label>Password <input name=\"password\" type=\"password\" required></label>\n\
        <button type=\"submit\">Log in</button>\n\
        </form>\n\
        <p>No account? <a href=\"/signup\">Sign up</a></p>\n";
    layout("Log in", notice, body)
}

pub fn create_card(notice: Option<&str>) -> Html<String> {
    let body = "<form method=\"post\" action=\"/create_credit_card\">\n\
        <label>Card number <input name=\"card_number\" required></label>\n\
        <button type=\"submit\">Save card</button>\n\
        </form>\n";
    layout("Add a credit card", notice, body)
}

pub fn card_detail(notice: Option<&str>, card: &CreditCard) -> Html<String> {
    let body = format!(
        "<dl>\n<dt>Card id</dt><dd>{id}</dd>\n<dt>Card number</dt><dd>{number}</dd>\n</dl>\n",
        id = card.id,
        number = escape_html(&card.card_number),
    );
    layout("Credit card", notice, &body)
}

pub fn failure() -> Html<String> {
    layout("Error", None, "<p>Something went wrong. Please try again later.</p>\n")
}

fn layout(title: &str, notice: Option<&str>, body: &str) -> Html<String> {
    let notice = notice
        .map(|text| format!("<p class=\"notice\">{}</p>\n", escape_html(text)))
        .unwrap_or_default();
    let title = escape_html(title);

    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | cardvault</title>\n</head>\n<body>\n\
         <nav><a href=\"/\">cardvault</a></nav>\n<h1>{title}</h1>\n{notice}{body}</body>\n</html>\n"
    ))
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
