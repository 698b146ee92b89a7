pub mod documents;
pub mod glossary;
pub mod projects;
pub mod runs;
pub mod terms;
