pub mod camper;
pub mod care_data;
pub mod volunteer;
pub mod volunteer_assignment;

pub use camper::Entity as CamperEntity;
pub use care_data::Entity as CareDataEntity;
pub use volunteer::Entity as VolunteerEntity;
pub use volunteer_assignment::Entity as VolunteerAssignmentEntity;
