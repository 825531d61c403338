pub mod editor;
pub mod nav;
pub mod trip_list;
