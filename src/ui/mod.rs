pub mod db_col_table;
pub mod doc_list;
pub mod editor;
pub mod highlight;
pub mod json_viewer;
pub mod modal;
pub mod tui;
pub mod view;
