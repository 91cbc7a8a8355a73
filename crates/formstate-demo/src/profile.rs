#![forbid(unsafe_code)]

//! The demo's profile form and the scripted flows that drive it.

use std::fmt::Write as _;

use formstate::validation::{MaxLength, Validator};
use formstate::{Form, FormField, UpdatePolicy, impl_fields};

pub struct Address {
    pub street: FormField<String>,
    pub city: FormField<String>,
    pub postcode: FormField<String>,
}
impl_fields!(Address { street, city, postcode });

pub struct Profile {
    pub name: FormField<String>,
    pub email: FormField<String>,
    pub age: FormField<u32>,
    pub address: Address,
    pub terms: FormField<Option<bool>>,
}
impl_fields!(Profile { name, email, age, address, terms });

/// Labels in slot order.
pub const LABELS: [&str; 7] = [
    "name", "email", "age", "street", "city", "postcode", "terms",
];

/// Build an empty profile form.
///
/// # Errors
///
/// Fails if the postcode pattern does not compile.
pub fn profile_form(policy: UpdatePolicy) -> Result<Form<Profile>, formstate::validation::PatternError> {
    let text = |validators: Vec<Validator<String>>| {
        FormField::with_policy(String::new(), validators, policy)
    };
    Ok(Form::new(Profile {
        name: text(vec![
            Validator::required(),
            MaxLength::new(32).graphemes().into(),
        ]),
        email: text(vec![Validator::required(), Validator::email()]),
        age: FormField::with_policy(0, [Validator::min(18), Validator::max(130)], policy),
        address: Address {
            street: text(vec![Validator::required()]),
            city: text(vec![Validator::required(), Validator::min_length(2)]),
            postcode: text(vec![Validator::pattern(r"[0-9]{5}")?]),
        },
        terms: FormField::with_policy(None, [Validator::required_true()], policy),
    }))
}

/// One-line summary of the form's state.
pub fn summary(form: &Form<Profile>) -> String {
    let invalid: Vec<&str> = form
        .invalid_slots()
        .into_iter()
        .filter_map(|slot| LABELS.get(slot).copied())
        .collect();
    let mut line = format!(
        "valid={} dirty={}",
        form.is_valid(),
        form.is_dirty()
    );
    if !invalid.is_empty() {
        let _ = write!(line, " invalid=[{}]", invalid.join(", "));
    }
    line
}

/// Commit each edit directly, as a field would on every keystroke.
pub fn run_change_flow(form: &mut Form<Profile>, out: &mut Vec<String>) {
    out.push(format!("start: {}", summary(form)));

    form.fields_mut().name.set("Mario".into());
    out.push(format!("name set: {}", summary(form)));

    form.fields_mut().email.set("mario@".into());
    out.push(format!("email typo: {}", summary(form)));

    form.fields_mut().email.set("mario@example.com".into());
    out.push(format!("email fixed: {}", summary(form)));

    form.edit(|p| {
        p.age.set(33);
        p.address.street.set("1 Mushroom Way".into());
        p.address.city.set("Toad Town".into());
        p.address.postcode.set("12345".into());
        p.terms.set(Some(true));
    });
    out.push(format!("all filled: {}", summary(form)));

    form.mark_all_pristine();
    out.push(format!("saved: {}", summary(form)));
}

/// Stage every edit, then commit them together on submit.
pub fn run_submit_flow(form: &mut Form<Profile>, out: &mut Vec<String>) {
    out.push(format!("start: {}", summary(form)));

    form.edit(|p| {
        p.name.control_mut().set_pending_value("Luigi".into());
        p.email.control_mut().set_pending_value("luigi@example.com".into());
        p.age.control_mut().set_pending_value(12);
        p.address.street.control_mut().set_pending_value("2 Warp Pipe Lane".into());
        p.address.city.control_mut().set_pending_value("Sarasaland".into());
        p.address.postcode.control_mut().set_pending_value("54321".into());
        p.terms.control_mut().set_pending_value(Some(true));
    });
    out.push(format!("staged: {}", summary(form)));

    let committed = form.commit_all();
    out.push(format!("submitted {committed}: {}", summary(form)));

    form.edit(|p| p.age.control_mut().set_pending_value(35));
    let committed = form.commit_all();
    out.push(format!("resubmitted {committed}: {}", summary(form)));
}
