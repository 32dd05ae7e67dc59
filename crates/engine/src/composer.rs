/// Build the notification body for one record.
///
/// `display_date` is the occurrence date as `DD/MM/YYYY`.
pub fn compose_message(name: &str, role: &str, display_date: &str) -> String {
    format!(
        "🎉 *Recordatorio de Cumpleaños*\n\
         👤 *{}* ({})\n\
         📅 {}\n\
         \n\
         ¡Felicidades anticipadas! 🎂🎈",
        name, role, display_date
    )
}
