use super::Locale;
use crate::config::LocaleCode;

pub(super) static LOCALE: Locale = Locale {
    code: LocaleCode::Ru,
    first_names: FIRST_NAMES,
    last_names: LAST_NAMES,
    words: WORDS,
    phone_pattern: "+7 (9##) ###-##-##",
};

static FIRST_NAMES: &[&str] = &[
    "Александр", "Алексей", "Анастасия", "Андрей", "Анна", "Антон", "Артём", "Борис",
    "Вадим", "Валентина", "Василий", "Вера", "Виктор", "Виктория", "Владимир", "Галина",
    "Григорий", "Дарья", "Денис", "Дмитрий", "Евгений", "Евгения", "Екатерина", "Елена",
    "Иван", "Игорь", "Ирина", "Кирилл", "Константин", "Ксения", "Лариса", "Леонид",
    "Любовь", "Людмила", "Максим", "Марина", "Мария", "Михаил", "Надежда", "Наталья",
    "Никита", "Николай", "Оксана", "Олег", "Ольга", "Павел", "Полина", "Пётр", "Роман",
    "Светлана", "Сергей", "Станислав", "Татьяна", "Фёдор", "Юлия", "Юрий", "Яна",
];

static LAST_NAMES: &[&str] = &[
    "Алексеев", "Андреев", "Баранов", "Беляев", "Богданов", "Васильев", "Виноградов",
    "Волков", "Воробьёв", "Голубев", "Давыдов", "Егоров", "Жуков", "Зайцев", "Иванов",
    "Ильин", "Кириллов", "Киселёв", "Козлов", "Комаров", "Кузнецов", "Лебедев", "Макаров",
    "Максимов", "Медведев", "Михайлов", "Морозов", "Никитин", "Николаев", "Новиков",
    "Орлов", "Осипов", "Павлов", "Петров", "Поляков", "Попов", "Романов", "Семёнов",
    "Сергеев", "Сидоров", "Смирнов", "Соколов", "Соловьёв", "Степанов", "Тарасов",
    "Тимофеев", "Титов", "Филиппов", "Фролов", "Фёдоров", "Цветков", "Чернов", "Щербаков",
    "Яковлев",
];

static WORDS: &[&str] = &[
    "белый", "берег", "быстро", "весна", "ветер", "вечер", "вода", "воздух", "время",
    "город", "дерево", "дождь", "дом", "дорога", "звезда", "земля", "зима", "камень",
    "книга", "лес", "лето", "луна", "море", "мост", "небо", "ночь", "облако", "огонь",
    "озеро", "осень", "очень", "поле", "птица", "река", "рука", "свет", "север", "синий",
    "слово", "снег", "солнце", "стол", "тепло", "тихо", "трава", "утро", "холод", "цветок",
    "человек", "чистый", "шум", "юг",
];
