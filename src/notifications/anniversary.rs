use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use sqlx::MySqlPool;

use super::{Mail, Notifier, deliver_all, escape_html};
use crate::error::{HrError, HrResult};
use crate::model::employee::{EMPLOYEE_COLUMNS, Employee, fetch_employee};
use crate::model::role::Role;
use crate::model::settings::HrAddonSettings;
use crate::settings::anniversary_recipient_ids;
use crate::utils::error_log::log_error;

pub const SUBJECT: &str = "Work Anniversary Reminder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub company: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderText {
    pub reminder_text: String,
    pub message: String,
}

pub fn is_anniversary(date_of_joining: NaiveDate, on: NaiveDate) -> bool {
    date_of_joining.day() == on.day()
        && date_of_joining.month() == on.month()
        && date_of_joining.year() < on.year()
}

/// Active employees whose joining day and month fall on `on` in an earlier year.
pub fn select_anniversaries(candidates: Vec<Employee>, on: NaiveDate) -> Vec<Employee> {
    candidates
        .into_iter()
        .filter(|e| e.is_active() && is_anniversary(e.date_of_joining, on))
        .collect()
}

pub fn group_by_company(employees: Vec<Employee>) -> BTreeMap<String, Vec<Employee>> {
    let mut groups: BTreeMap<String, Vec<Employee>> = BTreeMap::new();
    for e in employees {
        groups.entry(e.company.clone()).or_default().push(e);
    }
    groups
}

pub fn pluralized_years(years: i32) -> String {
    if years == 1 {
        "1 year".to_string()
    } else {
        format!("{} years", years)
    }
}

/// `["a", "b", "c"]` becomes `"a, b & c"`.
pub fn comma_sep(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} & {}", head.join(", "), last),
    }
}

pub fn reminder_text(persons: &[Employee], anniversary: NaiveDate, today: NaiveDate) -> ReminderText {
    let days_ahead = (anniversary - today).num_days();
    let (days_alias, verb) = if days_ahead <= 0 {
        ("Today".to_string(), "completed")
    } else {
        (format!("{} days later", days_ahead), "will complete")
    };

    let names: Vec<String> = persons.iter().map(|p| escape_html(&p.full_name())).collect();
    let with_years: Vec<String> = persons
        .iter()
        .map(|p| {
            let years = anniversary.year() - p.date_of_joining.year();
            format!("{} {} {}", escape_html(&p.full_name()), verb, pluralized_years(years))
        })
        .collect();

    ReminderText {
        reminder_text: format!("{} {} at our Company! 🎉", days_alias, comma_sep(&with_years)),
        message: format!(
            "A friendly reminder of an important date for our team.<br>Everyone, let’s congratulate {} on their work anniversary!",
            comma_sep(&names)
        ),
    }
}

pub fn build_mail(recipients: Vec<String>, persons: &[Employee], anniversary: NaiveDate, today: NaiveDate) -> Mail {
    let text = reminder_text(persons, anniversary, today);
    let people: String = persons
        .iter()
        .map(|p| format!("<li>{}</li>", escape_html(&p.full_name())))
        .collect();
    Mail {
        recipients,
        subject: SUBJECT.to_string(),
        html_body: format!(
            "<h3>{}</h3><p>{}</p><ul>{}</ul><p>{}</p>",
            SUBJECT, text.reminder_text, people, text.message
        ),
    }
}

/// One mail per company, addressed to that company's recipients.
pub fn plan_company_mails(
    groups: &BTreeMap<String, Vec<Employee>>,
    recipients: &[Recipient],
    anniversary: NaiveDate,
    today: NaiveDate,
) -> Vec<Mail> {
    groups
        .iter()
        .filter_map(|(company, persons)| {
            let to: Vec<String> = recipients
                .iter()
                .filter(|r| &r.company == company)
                .map(|r| r.email.clone())
                .collect();
            (!to.is_empty()).then(|| build_mail(to, persons, anniversary, today))
        })
        .collect()
}

/// One mail per leave approver listing only the people they approve for.
/// Approvers outside `active_approvers` are skipped.
pub fn plan_approver_mails(
    groups: &BTreeMap<String, Vec<Employee>>,
    active_approvers: &HashSet<String>,
    anniversary: NaiveDate,
    today: NaiveDate,
) -> Vec<Mail> {
    let mut mails = Vec::new();
    for persons in groups.values() {
        let mut by_approver: BTreeMap<&str, Vec<Employee>> = BTreeMap::new();
        for p in persons {
            match p.leave_approver.as_deref().map(str::trim) {
                Some(approver) if active_approvers.contains(approver) => {
                    by_approver.entry(approver).or_default().push(p.clone());
                }
                Some(approver) if !approver.is_empty() => {
                    tracing::debug!(approver, employee = %p.employee_code, "Leave approver not active");
                }
                _ => {}
            }
        }
        for (approver, people) in by_approver {
            mails.push(build_mail(vec![approver.to_string()], &people, anniversary, today));
        }
    }
    mails
}

pub async fn employees_with_anniversary_on(pool: &MySqlPool, date: NaiveDate) -> HrResult<Vec<Employee>> {
    let sql = format!(
        r#"
        SELECT {EMPLOYEE_COLUMNS} FROM employees
        WHERE DAY(date_of_joining) = ? AND MONTH(date_of_joining) = ?
        ORDER BY company, first_name, last_name
        "#
    );
    let candidates = sqlx::query_as::<_, Employee>(&sql)
        .bind(date.day())
        .bind(date.month())
        .fetch_all(pool)
        .await?;
    Ok(select_anniversaries(candidates, date))
}

async fn settings_recipients(pool: &MySqlPool) -> HrResult<Vec<Recipient>> {
    let mut recipients = Vec::new();
    for id in anniversary_recipient_ids(pool).await? {
        let employee = fetch_employee(pool, id).await?;
        if !employee.is_active() {
            continue;
        }
        match employee.preferred_email() {
            Some(email) => recipients.push(Recipient {
                email: email.to_string(),
                company: employee.company.clone(),
            }),
            None => tracing::warn!(employee = %employee.employee_code, "Email not set for recipient"),
        }
    }
    Ok(recipients)
}

async fn role_recipients(pool: &MySqlPool, role: Role) -> HrResult<Vec<Recipient>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT e.user_id, e.company
        FROM users u
        JOIN employees e ON e.user_id = u.email
        WHERE u.role_id = ? AND u.is_active = TRUE AND e.status = 'Active'
        "#,
    )
    .bind(role.id())
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(email, company)| Recipient { email, company })
        .collect())
}

async fn active_employee_logins(pool: &MySqlPool) -> HrResult<HashSet<String>> {
    let logins = sqlx::query_scalar::<_, String>(
        "SELECT user_id FROM employees WHERE status = 'Active' AND user_id IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;
    Ok(logins.into_iter().collect())
}

/// Daily anniversary job. Returns the number of mails sent.
pub async fn send_work_anniversary_notifications(
    pool: &MySqlPool,
    notifier: &dyn Notifier,
    settings: &HrAddonSettings,
    today: NaiveDate,
) -> HrResult<usize> {
    if !settings.enable_work_anniversaries_notification {
        return Ok(0);
    }

    let mut mails = Vec::new();

    let recipients = settings_recipients(pool).await?;
    if recipients.is_empty() {
        tracing::warn!("No anniversary notification recipients configured");
    } else {
        let todays = group_by_company(employees_with_anniversary_on(pool, today).await?);
        mails.extend(plan_company_mails(&todays, &recipients, today, today));
    }

    let ahead = u64::try_from(settings.notification_x_days_before).unwrap_or(0);
    let upcoming_date = today.checked_add_days(Days::new(ahead)).unwrap_or(today);
    let upcoming = group_by_company(employees_with_anniversary_on(pool, upcoming_date).await?);

    if let Some(role_name) = settings.anniversary_notification_email_recipient_role.as_deref() {
        match Role::from_str(role_name) {
            Ok(role) => {
                let by_role = role_recipients(pool, role).await?;
                mails.extend(plan_company_mails(&upcoming, &by_role, upcoming_date, today));
            }
            Err(_) => tracing::warn!(role = role_name, "Unknown anniversary recipient role"),
        }
    }

    if settings.enable_work_anniversaries_notification_for_leave_approvers {
        let approvers = active_employee_logins(pool).await?;
        mails.extend(plan_approver_mails(&upcoming, &approvers, upcoming_date, today));
    }

    let delivery = deliver_all(notifier, &mails).await;
    if delivery.failures.is_empty() {
        return Ok(delivery.sent);
    }
    for failure in &delivery.failures {
        log_error(pool, "Work anniversary mail failed", failure).await;
    }
    Err(HrError::Mail(format!(
        "{} of {} anniversary mails failed, {} sent",
        delivery.failures.len(),
        mails.len(),
        delivery.sent
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::sample_employee;
    use crate::notifications::testing::RecordingNotifier;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn person(id: u64, company: &str, first: &str, joined: NaiveDate) -> Employee {
        let mut e = sample_employee(id, company);
        e.first_name = first.to_string();
        e.last_name = "Doe".to_string();
        e.date_of_joining = joined;
        e
    }

    #[test]
    fn anniversary_needs_same_day_month_and_earlier_year() {
        assert!(is_anniversary(d(2019, 3, 4), d(2024, 3, 4)));
        assert!(!is_anniversary(d(2024, 3, 4), d(2024, 3, 4)));
        assert!(!is_anniversary(d(2019, 3, 5), d(2024, 3, 4)));
    }

    #[test]
    fn selection_skips_inactive_and_other_dates() {
        let on = d(2024, 3, 4);
        let mut left = person(2, "Acme", "Lena", d(2018, 3, 4));
        left.status = "Left".to_string();
        let candidates = vec![
            person(1, "Acme", "Jane", d(2019, 3, 4)),
            left,
            person(3, "Acme", "Newbie", d(2024, 3, 4)),
            person(4, "Acme", "Other", d(2019, 3, 5)),
        ];
        let selected = select_anniversaries(candidates, on);
        let ids: Vec<u64> = selected.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn names_are_escaped_in_the_body() {
        let today = d(2024, 3, 4);
        let persons = vec![person(1, "Acme", "<b>Jane</b>", d(2020, 3, 4))];
        let mail = build_mail(vec!["hr@acme.test".into()], &persons, today, today);
        assert!(mail.html_body.contains("&lt;b&gt;Jane&lt;/b&gt; Doe"));
        assert!(!mail.html_body.contains("<b>Jane"));
    }

    #[test]
    fn joins_names_like_a_sentence() {
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(comma_sep(&names(&["Jim"])), "Jim");
        assert_eq!(comma_sep(&names(&["Jim", "Rim"])), "Jim & Rim");
        assert_eq!(comma_sep(&names(&["Jim", "Rim", "Dim"])), "Jim, Rim & Dim");
    }

    #[test]
    fn text_for_today() {
        let today = d(2024, 3, 4);
        let persons = vec![person(1, "Acme", "Jane", d(2023, 3, 4))];
        let text = reminder_text(&persons, today, today);
        assert_eq!(text.reminder_text, "Today Jane Doe completed 1 year at our Company! 🎉");
        assert_eq!(
            text.message,
            "A friendly reminder of an important date for our team.<br>Everyone, let’s congratulate Jane Doe on their work anniversary!"
        );
    }

    #[test]
    fn text_for_days_ahead_with_several_people() {
        let today = d(2024, 2, 26);
        let target = d(2024, 3, 4);
        let persons = vec![
            person(1, "Acme", "Jane", d(2019, 3, 4)),
            person(2, "Acme", "John", d(2022, 3, 4)),
        ];
        let text = reminder_text(&persons, target, today);
        assert_eq!(
            text.reminder_text,
            "7 days later Jane Doe will complete 5 years & John Doe will complete 2 years at our Company! 🎉"
        );
        assert!(text.message.contains("congratulate Jane Doe & John Doe on"));
    }

    #[test]
    fn company_mails_go_only_to_same_company_recipients() {
        let today = d(2024, 3, 4);
        let groups = group_by_company(vec![
            person(1, "Acme", "Jane", d(2020, 3, 4)),
            person(2, "Globex", "Hank", d(2021, 3, 4)),
        ]);
        let recipients = vec![
            Recipient { email: "hr@acme.test".into(), company: "Acme".into() },
            Recipient { email: "boss@acme.test".into(), company: "Acme".into() },
        ];
        let mails = plan_company_mails(&groups, &recipients, today, today);
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].recipients, vec!["hr@acme.test", "boss@acme.test"]);
        assert_eq!(mails[0].subject, SUBJECT);
        assert!(mails[0].html_body.contains("Jane Doe"));
        assert!(!mails[0].html_body.contains("Hank"));
    }

    #[test]
    fn approvers_get_only_their_people_and_inactive_are_skipped() {
        let today = d(2024, 2, 26);
        let target = d(2024, 3, 4);
        let mut jane = person(1, "Acme", "Jane", d(2020, 3, 4));
        jane.leave_approver = Some("lead@acme.test".into());
        let mut john = person(2, "Acme", "John", d(2020, 3, 4));
        john.leave_approver = Some("gone@acme.test".into());
        let mut jim = person(3, "Acme", "Jim", d(2020, 3, 4));
        jim.leave_approver = None;

        let groups = group_by_company(vec![jane, john, jim]);
        let active: HashSet<String> = ["lead@acme.test".to_string()].into_iter().collect();
        let mails = plan_approver_mails(&groups, &active, target, today);

        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].recipients, vec!["lead@acme.test"]);
        assert!(mails[0].html_body.contains("Jane Doe"));
        assert!(!mails[0].html_body.contains("John Doe"));
        assert!(!mails[0].html_body.contains("Jim Doe"));
    }

    #[actix_web::test]
    async fn planned_mails_reach_the_notifier() {
        let today = d(2024, 3, 4);
        let groups = group_by_company(vec![person(1, "Acme", "Jane", d(2020, 3, 4))]);
        let recipients = vec![Recipient { email: "hr@acme.test".into(), company: "Acme".into() }];
        let notifier = RecordingNotifier::default();
        for mail in plan_company_mails(&groups, &recipients, today, today) {
            notifier.send_mail(&mail).await.unwrap();
        }
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html_body.contains("Today Jane Doe completed 4 years"));
    }
}
