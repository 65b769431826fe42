mod chat_tests;
mod health_tests;
mod presence_tests;
mod upgrade_tests;
mod whiteboard_tests;
