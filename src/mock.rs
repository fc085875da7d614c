//! Fixture data standing in for the not-yet-wired backend: a sign-in that
//! derives the user from the email, one seeded conversation, the contact
//! directory, and a grade sheet.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Contact, Conversation, Grade, GradeCategory, Message, Participant, Role, User};
use crate::validation::{LoginRequest, Validate, ValidationErrors};

pub const MOCK_USER_ID: &str = "1";
pub const SEED_CONVERSATION_ID: &str = "1";

/// Accepts any well-formed credentials. The display name is the email's
/// local part and the role is guessed from the address.
pub fn mock_login(email: &str, password: &str) -> Result<User, ValidationErrors> {
    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
    .validate()?;

    let name = request
        .email
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string();
    let role = if request.email.contains("teacher") {
        Role::Teacher
    } else if request.email.contains("admin") {
        Role::Admin
    } else {
        Role::Parent
    };

    tracing::info!("Mock sign-in for {} as {}", request.email, role);
    Ok(User {
        id: MOCK_USER_ID.to_string(),
        name,
        email: request.email,
        role,
    })
}

fn teacher(id: &str, name: &str, subject: &str) -> Contact {
    Contact {
        id: id.into(),
        name: name.into(),
        role: Role::Teacher,
        subject: Some(subject.into()),
        children: Vec::new(),
        department: None,
    }
}

fn parent(id: &str, name: &str, child: &str) -> Contact {
    Contact {
        id: id.into(),
        name: name.into(),
        role: Role::Parent,
        subject: None,
        children: vec![child.into()],
        department: None,
    }
}

fn principal() -> Contact {
    Contact {
        id: "admin1".into(),
        name: "Principal Wilson".into(),
        role: Role::Admin,
        subject: None,
        children: Vec::new(),
        department: Some("Administration".into()),
    }
}

/// Who `role` may message.
pub fn contacts_for(role: Role) -> Vec<Contact> {
    match role {
        Role::Parent => vec![
            teacher("teacher1", "Ms. Johnson", "Mathematics"),
            teacher("teacher2", "Mr. Smith", "Science"),
            teacher("teacher3", "Mrs. Davis", "English"),
            principal(),
        ],
        Role::Teacher => vec![
            parent("parent1", "John Anderson", "Emma Anderson"),
            parent("parent2", "Sarah Miller", "Alex Miller"),
            parent("parent3", "Mike Johnson", "Sophie Johnson"),
            principal(),
        ],
        Role::Admin => vec![
            teacher("teacher1", "Ms. Johnson", "Mathematics"),
            teacher("teacher2", "Mr. Smith", "Science"),
            parent("parent1", "John Anderson", "Emma Anderson"),
            parent("parent2", "Sarah Miller", "Alex Miller"),
        ],
    }
}

/// Blank terms return every contact.
pub fn search_contacts<'a>(contacts: &'a [Contact], term: &str) -> Vec<&'a Contact> {
    let term = term.trim();
    contacts
        .iter()
        .filter(|c| term.is_empty() || c.matches(term))
        .collect()
}

/// The conversation a freshly signed-in user sees: a short, fully read
/// exchange with Ms. Johnson.
pub fn seed_conversations(viewer: &User, now: DateTime<Utc>) -> Vec<Conversation> {
    let johnson = Participant {
        id: "teacher1".into(),
        name: "Ms. Johnson".into(),
    };
    let messages = vec![
        Message {
            id: "1".into(),
            conversation_id: SEED_CONVERSATION_ID.into(),
            sender_id: johnson.id.clone(),
            sender_name: johnson.name.clone(),
            content: "Emma did excellent work on her math assignment today!".into(),
            timestamp: now - Duration::hours(2),
            read: true,
        },
        Message {
            id: "2".into(),
            conversation_id: SEED_CONVERSATION_ID.into(),
            sender_id: viewer.id.clone(),
            sender_name: viewer.name.clone(),
            content: "Thank you for the update on Emma's progress.".into(),
            timestamp: now - Duration::hours(1),
            read: true,
        },
    ];

    vec![
        Conversation::new(SEED_CONVERSATION_ID, &Participant::from(viewer), &johnson)
            .with_messages(messages),
    ]
}

struct GradeRow {
    subject: &'static str,
    assignment: &'static str,
    category: GradeCategory,
    score: f64,
    max_score: f64,
    letter: &'static str,
    days_ago: i64,
    teacher: &'static str,
    comments: &'static str,
}

const EMMA_GRADES: [GradeRow; 5] = [
    GradeRow {
        subject: "Mathematics",
        assignment: "Algebra Quiz #3",
        category: GradeCategory::Quiz,
        score: 92.0,
        max_score: 100.0,
        letter: "A-",
        days_ago: 2,
        teacher: "Ms. Johnson",
        comments: "Excellent work on quadratic equations!",
    },
    GradeRow {
        subject: "Mathematics",
        assignment: "Homework Set 12",
        category: GradeCategory::Homework,
        score: 18.0,
        max_score: 20.0,
        letter: "A-",
        days_ago: 5,
        teacher: "Ms. Johnson",
        comments: "Good understanding of concepts",
    },
    GradeRow {
        subject: "Science",
        assignment: "Chemistry Lab Report",
        category: GradeCategory::Project,
        score: 95.0,
        max_score: 100.0,
        letter: "A",
        days_ago: 7,
        teacher: "Mr. Smith",
        comments: "Outstanding analysis and presentation",
    },
    GradeRow {
        subject: "English",
        assignment: "Essay: To Kill a Mockingbird",
        category: GradeCategory::Assignment,
        score: 88.0,
        max_score: 100.0,
        letter: "B+",
        days_ago: 10,
        teacher: "Mrs. Davis",
        comments: "Well-structured argument, good use of evidence",
    },
    GradeRow {
        subject: "Science",
        assignment: "Physics Test - Motion",
        category: GradeCategory::Test,
        score: 85.0,
        max_score: 100.0,
        letter: "B",
        days_ago: 14,
        teacher: "Mr. Smith",
        comments: "Good grasp of basic concepts, review velocity calculations",
    },
];

/// Emma Anderson's recent grades, newest first.
pub fn mock_grades(now: DateTime<Utc>) -> Vec<Grade> {
    EMMA_GRADES
        .iter()
        .enumerate()
        .map(|(i, row)| Grade {
            id: (i + 1).to_string(),
            student_id: "student1".into(),
            student_name: "Emma Anderson".into(),
            subject: row.subject.into(),
            assignment_name: row.assignment.into(),
            category: row.category,
            score: row.score,
            max_score: row.max_score,
            percentage: (row.score / row.max_score * 100.0).round(),
            letter_grade: row.letter.into(),
            date: now - Duration::days(row.days_ago),
            teacher_name: row.teacher.into(),
            comments: Some(row.comments.into()),
        })
        .collect()
}
