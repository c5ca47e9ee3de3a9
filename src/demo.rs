// Demo data set used by the `demo` admin command and `POST /api/demo`

use crate::student::{Grades, NewStudent};

/// (identity, last name, first name, age, track, math, physics, info)
const DEMO_ROWS: [(&str, &str, &str, u32, &str, f64, f64, f64); 5] = [
    ("12345678", "Dupont", "Jean", 20, "Informatique", 15.0, 12.0, 18.0),
    ("87654321", "Martin", "Marie", 22, "Mathématiques", 18.0, 14.0, 16.0),
    ("23456789", "Dubois", "Pierre", 21, "Physique", 10.0, 17.0, 12.0),
    ("98765432", "Leroy", "Sophie", 19, "Chimie", 8.0, 9.0, 11.0),
    ("34567890", "Moreau", "Thomas", 23, "Biologie", 16.0, 13.0, 14.0),
];

pub fn demo_students() -> Vec<NewStudent> {
    DEMO_ROWS
        .iter()
        .map(|&(identity, last, first, age, track, math, physics, info)| {
            NewStudent::new(identity, last, first, age, track)
                .with_grades(Grades::complete(math, physics, info))
        })
        .collect()
}
